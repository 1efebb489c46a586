//! Account command handlers

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use serde_json::json;
use tracing::debug;

use storyapp_core::{Config, LoginViewModel, MainViewModel, SignupViewModel};

use super::AppRepository;
use crate::output::{Output, OutputFormat};

/// Create an account
pub async fn register(
    repository: AppRepository,
    name: String,
    email: String,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let password = resolve_password(password)?;
    let vm = SignupViewModel::new(repository);

    vm.register(&name, &email, &password).await?;

    if let Some(message) = vm.error_message().borrow().clone() {
        bail!(message);
    }
    let message = vm.signup_result().borrow().clone().unwrap_or_default();
    output.success(&format!("{} Log in with `storyapp login -e {}`", message, email));
    Ok(())
}

/// Log in and persist the session
pub async fn login(
    repository: AppRepository,
    email: String,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let password = resolve_password(password)?;
    let vm = LoginViewModel::new(repository);

    vm.login(&email, &password).await?;

    if let Some(message) = vm.error_message().borrow().clone() {
        bail!(message);
    }
    match vm.login_result().borrow().clone() {
        Some(session) => output.print_session(&session),
        None => bail!(storyapp_core::UNKNOWN_ERROR),
    }
    Ok(())
}

/// Forget the session and the cached feed
pub async fn logout(repository: AppRepository, output: &Output) -> Result<()> {
    let vm = MainViewModel::new(Arc::clone(&repository)).await;
    vm.logout().await?;

    if repository.current_session().is_logged_in {
        bail!("Failed to clear the session; see the log for details");
    }
    output.success("Logged out");
    Ok(())
}

/// Show session and cache status
pub async fn status(repository: AppRepository, config: &Config, output: &Output) -> Result<()> {
    let vm = MainViewModel::new(repository).await;
    let session = vm.session().borrow().clone();
    let cached = vm.stories().snapshot().items.len();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                json!({
                    "email": session.email,
                    "is_logged_in": session.is_logged_in,
                    "api_url": config.api_url,
                    "data_dir": config.data_dir,
                    "cached_stories": cached
                })
            );
        }
        OutputFormat::Quiet => output.print_session(&session),
        OutputFormat::Human => {
            println!("Storyapp Status");
            println!("===============");
            println!();
            output.print_session(&session);
            println!();
            println!("Service:  {}", config.api_url);
            println!("Storage:  {}", config.data_dir.display());
            println!("Cached:   {} story(ies)", cached);
        }
    }

    Ok(())
}

/// Use the given password or ask for one
///
/// A terminal gets a prompt with echo turned off; piped input is read as a
/// single line.
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let password = if io::stdin().is_terminal() {
        debug!("Prompting for password");
        prompt_hidden("Password: ")?
    } else {
        debug!("Reading password from stdin");
        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .context("Failed to read password")?;
        input.trim_end_matches(['\r', '\n']).to_string()
    };

    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

/// What a key press does to a password being typed
#[derive(Debug, PartialEq, Eq)]
enum PasswordKey {
    Continue,
    Done,
    Cancelled,
}

fn apply_key(password: &mut String, code: KeyCode, modifiers: KeyModifiers) -> PasswordKey {
    match code {
        KeyCode::Enter => PasswordKey::Done,
        KeyCode::Esc => PasswordKey::Cancelled,
        KeyCode::Char('c') | KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
            PasswordKey::Cancelled
        }
        KeyCode::Backspace => {
            password.pop();
            PasswordKey::Continue
        }
        KeyCode::Char(c) => {
            password.push(c);
            PasswordKey::Continue
        }
        _ => PasswordKey::Continue,
    }
}

/// Prompt on the terminal without echoing what is typed
fn prompt_hidden(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    enable_raw_mode().context("Failed to turn off terminal echo")?;
    let result = read_hidden();
    disable_raw_mode()?;
    println!();
    result
}

fn read_hidden() -> Result<String> {
    let mut password = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match apply_key(&mut password, key.code, key.modifiers) {
            PasswordKey::Continue => {}
            PasswordKey::Done => return Ok(password),
            PasswordKey::Cancelled => bail!("Password entry cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_keys(keys: &[(KeyCode, KeyModifiers)]) -> (String, PasswordKey) {
        let mut password = String::new();
        let mut last = PasswordKey::Continue;
        for (code, modifiers) in keys {
            last = apply_key(&mut password, *code, *modifiers);
            if last != PasswordKey::Continue {
                break;
            }
        }
        (password, last)
    }

    #[test]
    fn test_typed_password_with_correction() {
        let none = KeyModifiers::NONE;
        let (password, outcome) = type_keys(&[
            (KeyCode::Char('s'), none),
            (KeyCode::Char('e'), none),
            (KeyCode::Char('x'), none),
            (KeyCode::Backspace, none),
            (KeyCode::Char('c'), none),
            (KeyCode::Char('R'), KeyModifiers::SHIFT),
            (KeyCode::Enter, none),
        ]);

        assert_eq!(outcome, PasswordKey::Done);
        assert_eq!(password, "secR");
    }

    #[test]
    fn test_ctrl_c_cancels_password_entry() {
        let (_, outcome) = type_keys(&[
            (KeyCode::Char('a'), KeyModifiers::NONE),
            (KeyCode::Char('c'), KeyModifiers::CONTROL),
            (KeyCode::Enter, KeyModifiers::NONE),
        ]);
        assert_eq!(outcome, PasswordKey::Cancelled);

        let (_, outcome) = type_keys(&[(KeyCode::Esc, KeyModifiers::NONE)]);
        assert_eq!(outcome, PasswordKey::Cancelled);
    }

    #[test]
    fn test_given_password_skips_prompt() {
        assert_eq!(resolve_password(Some("pw".to_string())).unwrap(), "pw");
    }
}

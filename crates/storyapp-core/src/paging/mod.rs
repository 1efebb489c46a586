//! Feed pagination
//!
//! The [`StoryMediator`] moves pages from the service into the local cache;
//! the [`StoryPager`] is the observable list a screen binds to.

mod mediator;
mod pager;

pub use mediator::{LoadType, MediatorResult, StoryMediator, STARTING_PAGE_INDEX};
pub use pager::{LoadStates, LoadStatus, PagingSnapshot, StoryPager};

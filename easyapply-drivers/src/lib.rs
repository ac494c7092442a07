//! Driver layer: how the engine sees and touches a page.
//!
//! The engine never talks to WebDriver directly. It reads immutable
//! [`dom::PageSnapshot`]s and issues actions through the [`page::Page`]
//! trait, which has two implementations:
//!
//! - [`browser::page::WebDriverPage`]: fantoccini client with stealth
//!   launch arguments and human-like typing
//! - [`fixture::FixturePage`]: scripted in-memory screens for tests
//!
//! [`browser::driver::ApplyDriver`] owns the WebDriver session and hands out
//! pages.
pub mod browser;
pub mod dom;
pub mod fixture;
pub mod page;

pub use dom::{ControlKind, ElementId, ElementSnapshot, PageSignature, PageSnapshot, QuestionBlock};
pub use page::Page;

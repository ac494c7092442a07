//! WebDriver-backed implementation of [`crate::page::Page`].
pub mod behavioral;
pub mod driver;
pub mod fingerprint;
pub mod page;
pub mod stealth;

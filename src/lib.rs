//! Local mirror of the Neuromatch Academy preprocessed HCP release.
//!
//! [`fetch::Fetcher`] downloads and unpacks the OSF archives into a root
//! directory; [`accessor::Accessor`] reads BOLD time series and task EVs back
//! out of it. Both take an explicit [`config::DataConfig`].

pub mod accessor;
pub mod atlas;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod fetch;
pub mod fs_util;
pub mod http;
pub mod layout;
pub mod output;

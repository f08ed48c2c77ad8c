pub(crate) mod admin;
pub(crate) mod contact;
pub(crate) mod handlers_utilities;
pub(crate) mod images;
pub(crate) mod news;
pub(crate) mod newsletter;
pub(crate) mod ops;
pub(crate) mod pages;
pub(crate) mod session;
pub(crate) mod team;

pub(crate) mod foods;
pub(crate) mod orders;
pub(crate) mod users;

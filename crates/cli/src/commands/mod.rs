pub(crate) mod canon;
pub(crate) mod compile;
pub(crate) mod tokens;

pub mod db;
pub mod inventory;
pub mod server;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

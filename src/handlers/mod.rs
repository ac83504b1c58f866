pub mod accounts;
pub mod register;
pub mod register_logic;

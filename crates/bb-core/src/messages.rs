//! User-facing texts. Single fixed locale.

pub const LOGIN_USAGE: &str = "To log in, send\n\n/login <CPF> <password>";
pub const LOGIN_SUCCESS: &str = "Success, now just send /balance!";
pub const PLEASE_LOGIN: &str = "Please /login first...";
pub const UNKNOWN_COMMAND: &str = "The only supported commands are /login and /balance";

pub fn card_balance(number: &str, balance: &str) -> String {
    format!("Balance of card {number} is {balance}")
}

use rust_decimal::{Decimal, dec};

pub const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\n";
pub const CREATED: &str = "HTTP/1.1 201 Created\r\n";
pub const BAD_REQUEST: &str = "HTTP/1.1 400 Bad Request\r\n";
pub const UNAUTHORIZED: &str = "HTTP/1.1 401 Unauthorized\r\n";
pub const FORBIDDEN: &str = "HTTP/1.1 403 Forbidden\r\n";
pub const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\n";
pub const CONFLICT: &str = "HTTP/1.1 409 Conflict\r\n";
pub const PAYLOAD_TOO_LARGE: &str = "HTTP/1.1 413 Payload Too Large\r\n";
pub const INTERNAL_ERROR: &str = "HTTP/1.1 500 Internal Error\r\n";

pub const LOGGING_INCOMING_REQUEST: &str = "Incoming Request handling by: ";

pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Hard floor on any investment amount, independent of the product bounds.
pub const MIN_INVESTMENT_FLOOR: i64 = 1000;
pub const DEFAULT_MIN_INVESTMENT: i64 = 1000;

pub const RESET_CODE_MIN: u32 = 100_000;
pub const RESET_CODE_MAX: u32 = 999_999;

pub const INSIGHTS_WINDOW: usize = 500;

/// Money columns are `NUMERIC(15, 2)`, yields `NUMERIC(5, 2)`.
pub const MONEY_SCALE: u32 = 2;
pub const MAX_MONEY: Decimal = dec!(9999999999999.99);
pub const MAX_ANNUAL_YIELD: Decimal = dec!(999.99);

pub fn status_line(status: u16) -> &'static str {
    match status {
        200 => OK_RESPONSE,
        201 => CREATED,
        400 => BAD_REQUEST,
        401 => UNAUTHORIZED,
        403 => FORBIDDEN,
        404 => NOT_FOUND,
        409 => CONFLICT,
        413 => PAYLOAD_TOO_LARGE,
        _ => INTERNAL_ERROR,
    }
}

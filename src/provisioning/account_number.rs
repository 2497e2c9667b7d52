use chrono::NaiveDate;

use crate::domain::{AccountNumber, IdentityNumber};

/// Bank prefix on every issued account number.
pub const ACCOUNT_PREFIX: &str = "42";

/// Build an account number: prefix, last four identity digits, then the date
/// of birth as `YYMMDD`. Always 12 digits.
pub fn generate(dob: NaiveDate, identity: &IdentityNumber) -> AccountNumber {
    AccountNumber(format!(
        "{}{}{}",
        ACCOUNT_PREFIX,
        identity.last4(),
        dob.format("%y%m%d")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_account_number_layout() {
        let identity = IdentityNumber::parse("12345678901").unwrap();

        let number = generate(date("1995-03-15"), &identity);

        assert_eq!(number.as_str(), "428901950315");
    }

    #[test]
    fn test_two_digit_year_and_padding() {
        let identity = IdentityNumber::parse("34567890123").unwrap();

        assert_eq!(generate(date("2001-11-05"), &identity).as_str(), "420123011105");
        assert_eq!(generate(date("2000-01-09"), &identity).as_str(), "420123000109");
    }

    #[test]
    fn test_always_twelve_digits() {
        let identity = IdentityNumber::parse("00000000000").unwrap();

        for raw in ["1900-01-01", "1975-12-31", "2099-06-30"] {
            let number = generate(date(raw), &identity);
            assert_eq!(number.as_str().len(), 12);
            assert!(number.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }
}

//! Parses HTTP dates per RFC 2616 §3.3.1: RFC 1123, RFC 850, and the
//! asctime format, all normalized to a UTC Unix timestamp.
//!
//! ```rust
//! use tilestore_core::http_date::parse_http_date;
//!
//! assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap(), 784111777);
//! assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT").unwrap(), 784111777);
//! assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994").unwrap(), 784111777);
//! ```

use anyhow::{Result, bail};

fn month_index(name: &str) -> Option<u32> {
	const MONTHS: [&str; 12] = [
		"Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
	];
	MONTHS.iter().position(|m| *m == name).map(|i| i as u32)
}

/// Days since the Unix epoch for `(year, month0, day)`, proleptic Gregorian.
/// `timegm`'s calendar arithmetic, spelled out instead of hidden behind libc.
fn days_from_civil(year: i64, month0: u32, day: u32) -> i64 {
	let y = if month0 < 2 { year - 1 } else { year };
	let era = if y >= 0 { y } else { y - 399 } / 400;
	let yoe = (y - era * 400) as i64;
	let mp = (month0 as i64 + 10) % 12;
	let doy = (153 * mp + 2) / 5 + day as i64 - 1;
	let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
	era * 146_097 + doe - 719_468
}

fn timegm(year: i64, month0: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
	days_from_civil(year, month0, day) * 86_400 + i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second)
}

/// Two-digit years below 70 are 2000-era, at or above 70 are 1900-era — the
/// literal pivot used by the reference grammar, kept as-is (see SPEC_FULL.md
/// §4.9).
fn expand_two_digit_year(year: u32) -> i64 {
	if year < 70 { 2000 + i64::from(year) } else { 1900 + i64::from(year) }
}

struct Tokens<'a> {
	rest: &'a str,
}

impl<'a> Tokens<'a> {
	fn new(input: &'a str) -> Tokens<'a> {
		Tokens { rest: input.trim() }
	}

	fn skip_ws(&mut self) {
		self.rest = self.rest.trim_start();
	}

	fn take_literal(&mut self, literal: &str) -> Result<()> {
		self.skip_ws();
		if let Some(rest) = self.rest.strip_prefix(literal) {
			self.rest = rest;
			Ok(())
		} else {
			bail!("expected {literal:?}, found {:?}", self.rest)
		}
	}

	fn take_digits(&mut self, count: usize) -> Result<u32> {
		self.skip_ws();
		if self.rest.len() < count || !self.rest.as_bytes()[..count].iter().all(u8::is_ascii_digit) {
			bail!("expected {count} digits, found {:?}", self.rest);
		}
		let (digits, rest) = self.rest.split_at(count);
		self.rest = rest;
		Ok(digits.parse().unwrap())
	}

	fn take_alpha(&mut self) -> Result<&'a str> {
		self.skip_ws();
		let end = self.rest.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(self.rest.len());
		if end == 0 {
			bail!("expected an alphabetic token, found {:?}", self.rest);
		}
		let (word, rest) = self.rest.split_at(end);
		self.rest = rest;
		Ok(word)
	}
}

/// `wkday "," SP 2DIGIT SP month SP 4DIGIT SP 2DIGIT ":" 2DIGIT ":" 2DIGIT SP "GMT"`
fn parse_rfc1123(input: &str) -> Result<i64> {
	let mut t = Tokens::new(input);
	t.take_alpha()?; // weekday, not cross-checked against the computed date
	t.take_literal(",")?;
	let day = t.take_digits(2)?;
	let month = month_index(t.take_alpha()?).ok_or_else(|| anyhow::anyhow!("unknown month"))?;
	let year = t.take_digits(4)?;
	let hour = t.take_digits(2)?;
	t.take_literal(":")?;
	let minute = t.take_digits(2)?;
	t.take_literal(":")?;
	let second = t.take_digits(2)?;
	t.take_literal("GMT")?;
	Ok(timegm(i64::from(year), month, day, hour, minute, second))
}

/// `weekday "-" 2DIGIT "-" month "-" 2DIGIT SP 2DIGIT ":" 2DIGIT ":" 2DIGIT SP "GMT"`
fn parse_rfc850(input: &str) -> Result<i64> {
	let mut t = Tokens::new(input);
	t.take_alpha()?; // full weekday name
	t.take_literal(",")?;
	let day = t.take_digits(2)?;
	t.take_literal("-")?;
	let month = month_index(t.take_alpha()?).ok_or_else(|| anyhow::anyhow!("unknown month"))?;
	t.take_literal("-")?;
	let year = expand_two_digit_year(t.take_digits(2)?);
	let hour = t.take_digits(2)?;
	t.take_literal(":")?;
	let minute = t.take_digits(2)?;
	t.take_literal(":")?;
	let second = t.take_digits(2)?;
	t.take_literal("GMT")?;
	Ok(timegm(year, month, day, hour, minute, second))
}

/// `wkday SP month SP ( 2DIGIT | SP 1DIGIT ) SP 2DIGIT ":" 2DIGIT ":" 2DIGIT SP 4DIGIT`
fn parse_asctime(input: &str) -> Result<i64> {
	let mut t = Tokens::new(input);
	t.take_alpha()?;
	let month = month_index(t.take_alpha()?).ok_or_else(|| anyhow::anyhow!("unknown month"))?;
	t.skip_ws();
	t.rest = t.rest.trim_start_matches(' ');
	let day = t.take_digits(if t.rest.as_bytes().get(1).is_some_and(u8::is_ascii_digit) { 2 } else { 1 })?;
	let hour = t.take_digits(2)?;
	t.take_literal(":")?;
	let minute = t.take_digits(2)?;
	t.take_literal(":")?;
	let second = t.take_digits(2)?;
	let year = t.take_digits(4)?;
	Ok(timegm(i64::from(year), month, day, hour, minute, second))
}

/// Parses any of the three HTTP date forms, returning a UTC Unix timestamp.
/// Returns an error ("not parsed") rather than guessing at a fallback; the
/// caller decides what, if anything, to do on failure.
pub fn parse_http_date(input: &str) -> Result<i64> {
	let input = input.trim();
	parse_rfc1123(input)
		.or_else(|_| parse_rfc850(input))
		.or_else(|_| parse_asctime(input))
		.map_err(|_| anyhow::anyhow!("{input:?} does not match RFC 1123, RFC 850, or asctime"))
}

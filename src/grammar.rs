//! Payload literal sub-grammar, parsed from the remainder of a
//! `setdefaultdata` or `invoke` line.
//!
//! Three closed forms exist: a byte array `{v1, v2, ...}`, quoted text (one or
//! more double-quoted segments separated only by whitespace), and
//! `repeat(value, times)`. Anything else is rejected here at the grammar
//! site. Values come out as raw `u64`s; the parser applies the range rules.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, hex_digit1, multispace0},
    combinator::{map_opt, recognize},
    multi::{many1, separated_list1},
    sequence::{delimited, preceded, separated_pair},
    IResult, Parser,
};

/// A syntactically valid payload literal before range checking.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Bytes(Vec<u64>),
    Text(String),
    Repeat { value: u64, times: u64 },
}

/// Parse a complete payload literal. The whole input must be consumed (up to
/// trailing whitespace); `None` means malformed syntax.
pub fn parse_payload(input: &str) -> Option<RawPayload> {
    match alt((repeat_spec, byte_array, text_literal)).parse(input.trim()) {
        Ok((rest, payload)) if rest.trim().is_empty() => Some(payload),
        _ => None,
    }
}

/// Parse a single numeric literal: `0x` hexadecimal, `0`-prefixed octal, or
/// decimal. A lone `0` is decimal zero.
pub fn parse_number(s: &str) -> Option<u64> {
    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(digits, 16).ok()
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8).ok()
    } else {
        s.parse().ok()
    }
}

// repeat_spec = "repeat" "(" number "," number ")"
fn repeat_spec(input: &str) -> IResult<&str, RawPayload> {
    let (input, _) = tag("repeat")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, (value, times)) = delimited(
        char('('),
        separated_pair(ws_number, char(','), ws_number),
        char(')'),
    )
    .parse(input)?;
    Ok((input, RawPayload::Repeat { value, times }))
}

// byte_array = "{" number { "," number } "}"  (an empty array is rejected)
fn byte_array(input: &str) -> IResult<&str, RawPayload> {
    let (input, values) =
        delimited(char('{'), separated_list1(char(','), ws_number), char('}')).parse(input)?;
    Ok((input, RawPayload::Bytes(values)))
}

// text_literal = quoted_segment { quoted_segment } ; whitespace-separated
// segments concatenate verbatim, mirroring the scanner's string rule
fn text_literal(input: &str) -> IResult<&str, RawPayload> {
    let (input, segments) = many1(preceded(multispace0, quoted_segment)).parse(input)?;
    Ok((input, RawPayload::Text(segments.concat())))
}

fn quoted_segment(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"')).parse(input)
}

fn ws_number(input: &str) -> IResult<&str, u64> {
    delimited(multispace0, number, multispace0).parse(input)
}

fn number(input: &str) -> IResult<&str, u64> {
    map_opt(
        recognize(alt((
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            digit1,
        ))),
        parse_number,
    )
    .parse(input)
}

//! FITS header parsing.
//!
//! A header is a sequence of 2880-byte blocks, each holding 36 fixed-width 80-character
//! cards, terminated by the `END` card. A card is laid out as
//!
//! ```text
//! cols  1-8   keyword (left aligned, space padded)
//! cols  9-10  value indicator "= " (absent for COMMENT / HISTORY / END)
//! cols 11-80  value, optionally followed by "/ comment"
//! ```
//!
//! Values are decoded into [`HeaderValue`]: quoted strings (with `''` as an escaped
//! quote), logicals `T` / `F`, integers and floats (Fortran `D` exponents accepted).

use nom::{
    bytes::complete::{take, take_till},
    character::complete::char,
    IResult,
};

use super::FitsError;

pub const BLOCK_SIZE: usize = 2880;
pub const CARD_SIZE: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Logical(bool),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<HeaderValue>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    /// Parse a header starting at the beginning of `input`.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: bytes starting on a block boundary.
    ///
    /// Return
    /// ----------
    /// * The remaining input, positioned on the first block after the header, and the
    ///   decoded header. Fails with [`FitsError::Truncated`] if `END` is never reached.
    pub fn parse(input: &[u8]) -> Result<(&[u8], Header), FitsError> {
        let mut cards = Vec::new();
        let mut rest = input;
        loop {
            if rest.len() < BLOCK_SIZE {
                return Err(FitsError::Truncated("header without END card".into()));
            }
            let (block, tail) = rest.split_at(BLOCK_SIZE);
            rest = tail;
            for raw in block.chunks_exact(CARD_SIZE) {
                let (_, card) = parse_card(raw).map_err(|e| FitsError::Parse(e.to_string()))?;
                if card.keyword == "END" {
                    return Ok((rest, Header { cards }));
                }
                if !card.keyword.is_empty() {
                    cards.push(card);
                }
            }
        }
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Header { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|card| card.keyword.eq_ignore_ascii_case(keyword))
            .and_then(|card| card.value.as_ref())
    }

    pub fn get_str(&self, keyword: &str) -> Result<String, FitsError> {
        match self.get(keyword) {
            Some(HeaderValue::Str(s)) => Ok(s.clone()),
            Some(other) => Err(FitsError::KeywordType(keyword.to_string(), format!("{other:?}"))),
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
        }
    }

    pub fn get_f64(&self, keyword: &str) -> Result<f64, FitsError> {
        match self.get(keyword) {
            Some(HeaderValue::Float(v)) => Ok(*v),
            Some(HeaderValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(FitsError::KeywordType(keyword.to_string(), format!("{other:?}"))),
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
        }
    }

    pub fn get_i64(&self, keyword: &str) -> Result<i64, FitsError> {
        match self.get(keyword) {
            Some(HeaderValue::Int(v)) => Ok(*v),
            Some(other) => Err(FitsError::KeywordType(keyword.to_string(), format!("{other:?}"))),
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
        }
    }

    /// Integer keyword with a fallback when absent.
    pub fn get_i64_or(&self, keyword: &str, default: i64) -> Result<i64, FitsError> {
        match self.get(keyword) {
            None => Ok(default),
            Some(_) => self.get_i64(keyword),
        }
    }
}

fn parse_card(input: &[u8]) -> IResult<&[u8], Card> {
    let (input, raw_keyword) = take(8usize)(input)?;
    let (input, indicator) = take(2usize)(input)?;
    let (input, raw_value) = take(70usize)(input)?;

    let keyword = String::from_utf8_lossy(raw_keyword).trim().to_string();
    let value = if indicator == b"= " {
        parse_value(&String::from_utf8_lossy(raw_value))
    } else {
        None
    };
    Ok((input, Card { keyword, value }))
}

fn parse_value(field: &str) -> Option<HeaderValue> {
    let field = field.trim_start();
    if field.starts_with('\'') {
        return quoted_string(field).ok().map(|(_, s)| HeaderValue::Str(s));
    }
    let token = field.split('/').next().unwrap_or("").trim();
    match token {
        "" => None,
        "T" => Some(HeaderValue::Logical(true)),
        "F" => Some(HeaderValue::Logical(false)),
        _ => token
            .parse::<i64>()
            .map(HeaderValue::Int)
            .or_else(|_| token.replace(['D', 'd'], "E").parse::<f64>().map(HeaderValue::Float))
            .ok(),
    }
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    let (mut input, _) = char('\'')(input)?;
    let mut text = String::new();
    loop {
        let (rest, chunk) = take_till(|c| c == '\'')(input)?;
        text.push_str(chunk);
        let (rest, _) = char('\'')(rest)?;
        match char::<_, nom::error::Error<&str>>('\'')(rest) {
            Ok((after_escape, _)) => {
                text.push('\'');
                input = after_escape;
            }
            Err(_) => return Ok((rest, text.trim_end().to_string())),
        }
    }
}

/// Render one 80-character card.
pub fn format_card(keyword: &str, value: Option<&HeaderValue>) -> String {
    let body = match value {
        None => format!("{keyword:<8}"),
        Some(HeaderValue::Str(s)) => {
            let quoted = format!("'{:<8}'", s.replace('\'', "''"));
            format!("{keyword:<8}= {quoted:<20}")
        }
        Some(HeaderValue::Logical(b)) => {
            format!("{keyword:<8}= {:>20}", if *b { "T" } else { "F" })
        }
        Some(HeaderValue::Int(v)) => format!("{keyword:<8}= {v:>20}"),
        Some(HeaderValue::Float(v)) => format!("{keyword:<8}= {:>20}", format!("{v:?}")),
    };
    let mut card: String = body.chars().take(CARD_SIZE).collect();
    while card.len() < CARD_SIZE {
        card.push(' ');
    }
    card
}

#[cfg(test)]
mod header_test {
    use super::*;

    fn block(cards: &[String]) -> Vec<u8> {
        let mut bytes: Vec<u8> = cards.concat().into_bytes();
        bytes.extend(format_card("END", None).into_bytes());
        bytes.resize(bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, b' ');
        bytes
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_value("  'SWP     '  / camera"), Some(HeaderValue::Str("SWP".into())));
        assert_eq!(parse_value("'O''HARE'"), Some(HeaderValue::Str("O'HARE".into())));
        assert_eq!(parse_value("                   T"), Some(HeaderValue::Logical(true)));
        assert_eq!(parse_value("  2454833 / BJD ref"), Some(HeaderValue::Int(2454833)));
        assert_eq!(parse_value("  1.5D-3"), Some(HeaderValue::Float(1.5e-3)));
        assert_eq!(parse_value("   "), None);
    }

    #[test]
    fn test_parse_header_stops_at_end() {
        let cards = vec![
            format_card("SIMPLE", Some(&HeaderValue::Logical(true))),
            format_card("BJDREFI", Some(&HeaderValue::Int(2454833))),
            format_card("BJDREFF", Some(&HeaderValue::Float(0.00076))),
            format_card("COMMENT", None),
            format_card("DISPTYPE", Some(&HeaderValue::Str("LOW".into()))),
        ];
        let mut bytes = block(&cards);
        bytes.extend(vec![0u8; 16]);
        let (rest, header) = Header::parse(&bytes).unwrap();
        assert_eq!(rest.len(), 16);
        assert_eq!(header.get_i64("BJDREFI").unwrap(), 2454833);
        assert_eq!(header.get_f64("bjdreff").unwrap(), 0.00076);
        assert_eq!(header.get_f64("BJDREFI").unwrap(), 2454833.0);
        assert_eq!(header.get_str("DISPTYPE").unwrap(), "LOW");
        assert!(matches!(header.get_str("NOPE"), Err(FitsError::MissingKeyword(_))));
        assert!(matches!(header.get_str("BJDREFI"), Err(FitsError::KeywordType(..))));
    }

    #[test]
    fn test_missing_end_is_truncated() {
        let bytes = vec![b' '; BLOCK_SIZE];
        assert!(matches!(Header::parse(&bytes), Err(FitsError::Truncated(_))));
    }

    #[test]
    fn test_format_card_width() {
        let card = format_card("TTYPE1", Some(&HeaderValue::Str("WAVELENGTH".into())));
        assert_eq!(card.len(), CARD_SIZE);
        assert!(card.starts_with("TTYPE1  = 'WAVELENGTH'"));
    }
}

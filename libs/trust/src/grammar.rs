//! # Schema Text Grammar
//!
//! Parser for the Light VerSec textual language:
//!
//! ```text
//! file        := definition*
//! definition  := RULE_IDENT ":" def_expr
//! def_expr    := name ("&" comp_constraints)? ("<=" sign_constraints)?
//! name        := "/"? component ("/" component)*
//! component   := STRING | TAG_IDENT | RULE_IDENT
//! comp_constraints := cons_set ("|" cons_set)*
//! cons_set    := "{" cons_term ("," cons_term)* "}"
//! cons_term   := TAG_IDENT ":" cons_option ("|" cons_option)*
//! cons_option := STRING | TAG_IDENT | FN_IDENT "(" fn_args ")"
//! fn_args     := (STRING | TAG_IDENT)? ("," (STRING | TAG_IDENT))*
//! ```
//!
//! `;` and `//` start comments running to end of line. String literals hold
//! component URIs and are encoded at parse time.

use nom::branch::alt;
use nom::bytes::complete::{is_not, tag};
use nom::character::complete::{char, multispace1, satisfy};
use nom::combinator::{map, map_res, opt, recognize, value};
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;
use types::Component;

use crate::ast::{ConsOption, FnArg, LvsFile, NameUnit, Rule, TagConstraint};
use crate::error::{LvsError, LvsResult};

/// Eat whitespace and comments
fn sp(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), opt(is_not("\r\n")))),
            value((), pair(tag(";"), opt(is_not("\r\n")))),
        ))),
    )(input)
}

/// CNAME identifier: letter or underscore, then letters, digits, underscores
fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        many0(satisfy(|c| c.is_ascii_alphanumeric() || c == '_')),
    ))(input)
}

/// `#ident`, returned with the `#` kept
fn rule_ident(input: &str) -> IResult<&str, String> {
    map(recognize(pair(char('#'), ident)), str::to_string)(input)
}

/// A double-quoted component literal, encoded on the spot
fn component_literal(input: &str) -> IResult<&str, Vec<u8>> {
    map_res(
        delimited(char('"'), recognize(many0(satisfy(|c| c != '"'))), char('"')),
        |s: &str| Component::from_str(s).map(|c| c.wire().to_vec()),
    )(input)
}

fn name_unit(input: &str) -> IResult<&str, NameUnit> {
    let (input, _) = sp(input)?;
    alt((
        map(component_literal, NameUnit::Value),
        map(rule_ident, NameUnit::RuleRef),
        map(ident, |s| NameUnit::Pattern(s.to_string())),
    ))(input)
}

fn name(input: &str) -> IResult<&str, Vec<NameUnit>> {
    let (input, _) = sp(input)?;
    let (input, _) = opt(char('/'))(input)?;
    separated_list1(preceded(sp, char('/')), name_unit)(input)
}

fn fn_arg(input: &str) -> IResult<&str, FnArg> {
    let (input, _) = sp(input)?;
    alt((
        map(component_literal, FnArg::Value),
        map(ident, |s| FnArg::Pattern(s.to_string())),
    ))(input)
}

fn cons_option(input: &str) -> IResult<&str, ConsOption> {
    let (input, _) = sp(input)?;
    if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>('$')(input) {
        let (rest, fn_name) = ident(rest)?;
        let (rest, _) = sp(rest)?;
        let (rest, _) = char('(')(rest)?;
        let (rest, args) = separated_list0(preceded(sp, char(',')), fn_arg)(rest)?;
        let (rest, _) = sp(rest)?;
        let (rest, _) = char(')')(rest)?;
        return Ok((
            rest,
            ConsOption::Fn {
                name: format!("${fn_name}"),
                args,
            },
        ));
    }
    alt((
        map(component_literal, ConsOption::Value),
        map(ident, |s| ConsOption::Pattern(s.to_string())),
    ))(input)
}

fn cons_term(input: &str) -> IResult<&str, TagConstraint> {
    let (input, _) = sp(input)?;
    let (input, pattern) = ident(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = char(':')(input)?;
    let (input, options) = separated_list1(preceded(sp, char('|')), cons_option)(input)?;
    Ok((
        input,
        TagConstraint {
            pattern: pattern.to_string(),
            options,
        },
    ))
}

fn cons_set(input: &str) -> IResult<&str, Vec<TagConstraint>> {
    let (input, _) = sp(input)?;
    delimited(
        char('{'),
        separated_list1(preceded(sp, char(',')), cons_term),
        preceded(sp, char('}')),
    )(input)
}

fn definition(input: &str) -> IResult<&str, Rule> {
    let (input, _) = sp(input)?;
    let (input, id) = rule_ident(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = char(':')(input)?;
    let (input, name) = name(input)?;

    let (input, _) = sp(input)?;
    let (input, comp_cons) = match opt(char('&'))(input)? {
        (input, Some(_)) => separated_list1(preceded(sp, char('|')), cons_set)(input)?,
        (input, None) => (input, Vec::new()),
    };

    let (input, _) = sp(input)?;
    let (input, sign_cons) = match opt(tag("<="))(input)? {
        (input, Some(_)) => {
            separated_list1(preceded(sp, char('|')), preceded(sp, rule_ident))(input)?
        }
        (input, None) => (input, Vec::new()),
    };

    Ok((
        input,
        Rule {
            id,
            name,
            comp_cons,
            sign_cons,
        },
    ))
}

/// Parse a complete schema file
pub fn parse_lvs(text: &str) -> LvsResult<LvsFile> {
    let mut rules = Vec::new();
    let mut input = text;
    loop {
        let (rest, _) = sp(input).map_err(|e| LvsError::Syntax(e.to_string()))?;
        if rest.is_empty() {
            return Ok(LvsFile { rules });
        }
        match definition(rest) {
            Ok((rest, rule)) => {
                rules.push(rule);
                input = rest;
            }
            Err(e) => {
                let position = text.len() - rest.len();
                return Err(LvsError::Syntax(format!(
                    "at byte {position}: {e}"
                )));
            }
        }
    }
}

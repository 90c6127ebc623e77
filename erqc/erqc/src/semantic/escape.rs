//! Lowering of escaped strings `e'...'` into `printf` calls.
//!
//! Each component contributes a piece of the format string and, for
//! conversions, the SQL of its argument. The pieces are concatenated in
//! order, so `e'\u{29e3d}\%02X(15)'` becomes `printf('%s%02X',char(0x29e3d),15)`.

use crate::pr::EscapeItem;
use crate::sql::gen_expr::translate_expr;
use crate::{Error, Result, WithErrorInfo};

/// A piece of the format string and the arguments it consumes.
#[derive(Debug, PartialEq)]
pub(crate) struct Fragment {
    pub format: String,
    pub args: Vec<String>,
}

impl Fragment {
    fn text<S: ToString>(format: S) -> Self {
        Fragment {
            format: format.to_string(),
            args: Vec::new(),
        }
    }

    fn conversion<S: ToString>(format: S, arg: String) -> Self {
        Fragment {
            format: format.to_string(),
            args: vec![arg],
        }
    }
}

pub(crate) fn translate_escape_item(item: &EscapeItem) -> Result<Fragment> {
    Ok(match item {
        // the format string is itself an SQL string literal
        EscapeItem::Text(text) => Fragment::text(text.replace('\'', "''").replace('%', "%%")),
        EscapeItem::Apostrophe => Fragment::text("''"),
        EscapeItem::Percent => Fragment::text("%%"),
        EscapeItem::Backslash => Fragment::text("\\"),
        EscapeItem::Control(code) => Fragment::conversion("%s", format!("char({code})")),
        EscapeItem::Unicode(hex) => Fragment::conversion("%s", format!("char(0x{hex})")),
        EscapeItem::Format { spec, expr } => {
            Fragment::conversion(format!("%{spec}"), translate_expr(expr)?)
        }
        EscapeItem::Interpolate(expr) => Fragment::conversion("%s", translate_expr(expr)?),
        EscapeItem::Unknown(c) => {
            return Err(Error::new_semantic(format!("unsupported escape `\\{c}`"))
                .push_hint("use `\\\\` for a literal backslash"))
        }
    })
}

pub(crate) fn translate_escaped(items: &[EscapeItem]) -> Result<String> {
    let mut format = String::new();
    let mut args = Vec::new();
    for item in items {
        let fragment = translate_escape_item(item)?;
        format += &fragment.format;
        args.extend(fragment.args);
    }

    let mut sql = format!("printf('{format}'");
    for arg in args {
        sql += ",";
        sql += &arg;
    }
    Ok(sql + ")")
}

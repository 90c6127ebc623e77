use crate::pr::{BinOp, UnOp};

pub(super) fn translate_binary(left: String, op: BinOp, right: String) -> String {
    format!("{left} {op} {right}")
}

pub(super) fn translate_unary(op: UnOp, operand: String) -> String {
    match op {
        UnOp::Not => format!("not {operand}"),
        // `- -x` must not become the comment `--x`
        UnOp::Neg | UnOp::Plus if operand.starts_with(['-', '+']) => format!("{op} {operand}"),
        _ => format!("{op}{operand}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unary() {
        assert_eq!(translate_unary(UnOp::Neg, "a".to_string()), "-a");
        assert_eq!(translate_unary(UnOp::Neg, "-1".to_string()), "- -1");
        assert_eq!(translate_unary(UnOp::BitNot, "a".to_string()), "~a");
        assert_eq!(translate_unary(UnOp::Not, "a".to_string()), "not a");
    }

    #[test]
    fn test_binary() {
        assert_eq!(
            translate_binary("a".to_string(), BinOp::IsNotDistinctFrom, "b".to_string()),
            "a is not distinct from b"
        );
    }
}

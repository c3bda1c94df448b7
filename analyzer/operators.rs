// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The closed operator sets: precedence table and method alias table

/// Every binary expression operator. Keeping this closed lets the
/// precedence and alias tables be exhaustive matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum BinaryOp {
    #[strum(serialize = "**")]
    Pow,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = ">>>")]
    ShrU,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEq,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEq,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "is")]
    Is,
    #[strum(serialize = "!is")]
    NotIs,
    #[strum(serialize = "xor")]
    WordXor,
    #[strum(serialize = "^^")]
    XorXor,
    #[strum(serialize = "and")]
    WordAnd,
    #[strum(serialize = "&&")]
    AndAnd,
    #[strum(serialize = "or")]
    WordOr,
    #[strum(serialize = "||")]
    OrOr,
}

impl BinaryOp {
    pub fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    /// Higher binds tighter; terms sit at 1
    pub fn precedence(self) -> i32 {
        use BinaryOp::*;
        match self {
            Pow => 0,
            Mul | Div | Mod => -1,
            Add | Sub => -2,
            Shl | Shr | ShrU => -3,
            BitAnd => -4,
            BitXor => -5,
            BitOr => -6,
            Less | LessEq | Greater | GreaterEq => -7,
            Equals | NotEquals | Is | NotIs | WordXor | XorXor => -8,
            WordAnd | AndAnd => -9,
            WordOr | OrOr => -10,
        }
    }

    /// `&&`, `||`, `^^` and their word forms force both operands to bool
    pub fn is_logical(self) -> bool {
        use BinaryOp::*;
        matches!(self, WordAnd | AndAnd | WordOr | OrOr | WordXor | XorXor)
    }

    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Less | LessEq | Greater | GreaterEq | Equals | NotEquals | Is | NotIs)
    }

    /// `==`, `!=` and handle identity; these alias to `opEquals`
    pub fn is_equality(self) -> bool {
        use BinaryOp::*;
        matches!(self, Equals | NotEquals | Is | NotIs)
    }

    /// Handle identity comparisons never dispatch to an alias
    pub fn is_identity(self) -> bool {
        matches!(self, BinaryOp::Is | BinaryOp::NotIs)
    }

    /// The alias method a user type implements to overload this operator.
    /// Comparisons use `opEquals`/`opCmp` instead, logicals have no alias.
    pub fn alias(self) -> Option<&'static str> {
        use BinaryOp::*;
        match self {
            Pow => Some("opPow"),
            Mul => Some("opMul"),
            Div => Some("opDiv"),
            Mod => Some("opMod"),
            Add => Some("opAdd"),
            Sub => Some("opSub"),
            Shl => Some("opShl"),
            Shr => Some("opShr"),
            ShrU => Some("opShrU"),
            BitAnd => Some("opAnd"),
            BitXor => Some("opXor"),
            BitOr => Some("opOr"),
            Equals | NotEquals => Some("opEquals"),
            Less | LessEq | Greater | GreaterEq => Some("opCmp"),
            Is | NotIs | WordXor | XorXor | WordAnd | AndAnd | WordOr | OrOr => None,
        }
    }

    /// The `_r` alias used when a primitive meets a user type from the left
    pub fn reflected_alias(self) -> Option<&'static str> {
        use BinaryOp::*;
        match self {
            // comparisons are looked up symmetrically without a suffix
            Equals | NotEquals => Some("opEquals"),
            Less | LessEq | Greater | GreaterEq => Some("opCmp"),
            _ => self.alias().map(|alias| match alias {
                "opPow" => "opPow_r",
                "opMul" => "opMul_r",
                "opDiv" => "opDiv_r",
                "opMod" => "opMod_r",
                "opAdd" => "opAdd_r",
                "opSub" => "opSub_r",
                "opShl" => "opShl_r",
                "opShr" => "opShr_r",
                "opShrU" => "opShrU_r",
                "opAnd" => "opAnd_r",
                "opXor" => "opXor_r",
                "opOr" => "opOr_r",
                _ => alias,
            }),
        }
    }
}

/// Every assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum AssignOp {
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+=")]
    AddAssign,
    #[strum(serialize = "-=")]
    SubAssign,
    #[strum(serialize = "*=")]
    MulAssign,
    #[strum(serialize = "/=")]
    DivAssign,
    #[strum(serialize = "%=")]
    ModAssign,
    #[strum(serialize = "**=")]
    PowAssign,
    #[strum(serialize = "&=")]
    AndAssign,
    #[strum(serialize = "|=")]
    OrAssign,
    #[strum(serialize = "^=")]
    XorAssign,
    #[strum(serialize = "<<=")]
    ShlAssign,
    #[strum(serialize = ">>=")]
    ShrAssign,
    #[strum(serialize = ">>>=")]
    ShrUAssign,
}

impl AssignOp {
    pub fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    /// The alias method dispatched on the left-hand side's type
    pub fn alias(self) -> &'static str {
        use AssignOp::*;
        match self {
            Assign => "opAssign",
            AddAssign => "opAddAssign",
            SubAssign => "opSubAssign",
            MulAssign => "opMulAssign",
            DivAssign => "opDivAssign",
            ModAssign => "opModAssign",
            PowAssign => "opPowAssign",
            AndAssign => "opAndAssign",
            OrAssign => "opOrAssign",
            XorAssign => "opXorAssign",
            ShlAssign => "opShlAssign",
            ShrAssign => "opShrAssign",
            ShrUAssign => "opShrUAssign",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_expression_operator_the_lexer_classifies() {
        for text in [
            "**", "*", "/", "%", "+", "-", "<<", ">>", ">>>", "&", "^", "|", "<", "<=", ">",
            ">=", "==", "!=", "is", "!is", "xor", "^^", "and", "&&", "or", "||",
        ] {
            assert!(BinaryOp::parse(text).is_some(), "operator {text} missing");
            assert!(crate::lexer::reserved_properties(text).is_expr_op, "{text} not an expr op");
        }
    }

    #[test]
    fn precedence_table_matches_reference() {
        use BinaryOp::*;
        assert!(Pow.precedence() > Mul.precedence());
        assert!(Mul.precedence() > Add.precedence());
        assert!(Add.precedence() > Shl.precedence());
        assert!(Shl.precedence() > BitAnd.precedence());
        assert!(BitAnd.precedence() > BitXor.precedence());
        assert!(BitXor.precedence() > BitOr.precedence());
        assert!(BitOr.precedence() > Less.precedence());
        assert!(Less.precedence() > Equals.precedence());
        assert!(Equals.precedence() > AndAnd.precedence());
        assert!(AndAnd.precedence() > OrOr.precedence());
        assert_eq!(Equals.precedence(), NotIs.precedence());
    }

    #[test]
    fn every_assign_op_has_an_alias() {
        for text in
            ["=", "+=", "-=", "*=", "/=", "%=", "**=", "&=", "|=", "^=", "<<=", ">>=", ">>>="]
        {
            let op = AssignOp::parse(text).expect(text);
            assert!(op.alias().starts_with("op"));
            assert!(crate::lexer::reserved_properties(text).is_assign_op);
        }
    }
}

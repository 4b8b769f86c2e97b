//! Flag types shared by the scanner, parser, and transform.

bitflags::bitflags! {
    /// Flags for AST nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        const NONE        = 0;
        /// Declaration list uses `let`.
        const LET         = 1 << 0;
        /// Declaration list uses `const`.
        const CONST       = 1 << 1;
        /// Node was fabricated by the guard-injection transform and has no
        /// source text of its own.
        const SYNTHESIZED = 1 << 2;

        const BLOCK_SCOPED = Self::LET.bits() | Self::CONST.bits();
    }
}

bitflags::bitflags! {
    /// Flags on scanned tokens.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TokenFlags: u8 {
        const NONE                 = 0;
        const PRECEDING_LINE_BREAK = 1 << 0;
        const UNTERMINATED         = 1 << 1;
        const SCIENTIFIC           = 1 << 2;
        const HEX_SPECIFIER        = 1 << 3;
    }
}

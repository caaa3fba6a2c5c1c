//! Memory segments and their mapping onto Hack RAM.
//!
//! Four segments are reached through a base pointer cell, two sit at fixed
//! addresses, `constant` is immediate and `static` becomes an assembler
//! symbol qualified by the input unit.

use std::fmt;

/// Base RAM address of the temp segment (R5, 8 entries).
pub const TEMP_BASE: u16 = 5;

/// The eight VM memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Constant,
    Static,
}

/// How a segment's cells are addressed in the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Immediate literal, no storage (`constant`).
    Immediate,
    /// `RAM[base] + index`, base held in the named pointer cell.
    Indirect(&'static str),
    /// Direct at `TEMP_BASE + index`.
    Temp,
    /// Index 0/1 alias the THIS/THAT pointer cells themselves.
    Pointer,
    /// Assembler symbol `<unit>.<index>`.
    Static,
}

impl Segment {
    /// Parse a segment name as it appears in VM source.
    pub fn from_name(name: &str) -> Option<Segment> {
        match name {
            "local" => Some(Segment::Local),
            "argument" => Some(Segment::Argument),
            "this" => Some(Segment::This),
            "that" => Some(Segment::That),
            "temp" => Some(Segment::Temp),
            "pointer" => Some(Segment::Pointer),
            "constant" => Some(Segment::Constant),
            "static" => Some(Segment::Static),
            _ => None,
        }
    }

    /// Pointer cell holding the segment base, for the indirect segments.
    pub fn base_pointer(self) -> Option<&'static str> {
        match self {
            Segment::Local => Some("LCL"),
            Segment::Argument => Some("ARG"),
            Segment::This => Some("THIS"),
            Segment::That => Some("THAT"),
            _ => None,
        }
    }

    /// Addressing mode used by the code writer.
    pub fn access(self) -> Access {
        match self {
            Segment::Constant => Access::Immediate,
            Segment::Local => Access::Indirect("LCL"),
            Segment::Argument => Access::Indirect("ARG"),
            Segment::This => Access::Indirect("THIS"),
            Segment::That => Access::Indirect("THAT"),
            Segment::Temp => Access::Temp,
            Segment::Pointer => Access::Pointer,
            Segment::Static => Access::Static,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
            Segment::Constant => "constant",
            Segment::Static => "static",
        };
        f.write_str(name)
    }
}

/// Symbol aliased by `pointer 0` / `pointer 1`.
///
/// The classifier rejects any other index before codegen sees it.
#[inline]
pub fn pointer_symbol(index: u16) -> &'static str {
    if index == 0 { "THIS" } else { "THAT" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_segment_names() {
        assert_eq!(Segment::from_name("local"), Some(Segment::Local));
        assert_eq!(Segment::from_name("argument"), Some(Segment::Argument));
        assert_eq!(Segment::from_name("this"), Some(Segment::This));
        assert_eq!(Segment::from_name("that"), Some(Segment::That));
        assert_eq!(Segment::from_name("temp"), Some(Segment::Temp));
        assert_eq!(Segment::from_name("pointer"), Some(Segment::Pointer));
        assert_eq!(Segment::from_name("constant"), Some(Segment::Constant));
        assert_eq!(Segment::from_name("static"), Some(Segment::Static));
        assert_eq!(Segment::from_name("heap"), None);
    }

    #[test]
    fn indirect_segments_have_base_pointers() {
        assert_eq!(Segment::Local.base_pointer(), Some("LCL"));
        assert_eq!(Segment::Argument.base_pointer(), Some("ARG"));
        assert_eq!(Segment::This.base_pointer(), Some("THIS"));
        assert_eq!(Segment::That.base_pointer(), Some("THAT"));
        assert_eq!(Segment::Temp.base_pointer(), None);
        assert_eq!(Segment::Constant.base_pointer(), None);
    }

    #[test]
    fn pointer_indices_alias_this_and_that() {
        assert_eq!(pointer_symbol(0), "THIS");
        assert_eq!(pointer_symbol(1), "THAT");
    }

    #[test]
    fn access_modes() {
        assert_eq!(Segment::Constant.access(), Access::Immediate);
        assert_eq!(Segment::Local.access(), Access::Indirect("LCL"));
        assert_eq!(Segment::That.access(), Access::Indirect("THAT"));
        assert_eq!(Segment::Temp.access(), Access::Temp);
        assert_eq!(Segment::Pointer.access(), Access::Pointer);
        assert_eq!(Segment::Static.access(), Access::Static);
    }

    #[test]
    fn display_round_trips_names() {
        for name in [
            "local", "argument", "this", "that", "temp", "pointer", "constant", "static",
        ] {
            let seg = Segment::from_name(name).unwrap();
            assert_eq!(seg.to_string(), name);
        }
    }
}

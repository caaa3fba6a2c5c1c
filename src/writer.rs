//! Hack assembly emission for every VM command.
//!
//! Each command expands to a fixed instruction template appended to an
//! in-memory buffer, preceded by a `//` comment echoing the command. The
//! writer owns the counters that keep synthesized labels unique: one per
//! comparison family and one per callee for return sites.

use std::collections::HashMap;

use crate::command::{BranchKind, Command, Direction, FuncKind, Opcode};
use crate::segment::{Access, Segment, TEMP_BASE, pointer_symbol};

/// Code writer for Hack assembly.
pub struct CodeWriter {
    buf: String,
    eq_idx: u32,
    gt_idx: u32,
    lt_idx: u32,
    /// Per-callee counter for `<callee>$ret.<k>` return sites.
    return_sites: HashMap<String, u32>,
    /// Current input unit (file stem), qualifies static variables.
    unit: String,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(4096),
            eq_idx: 0,
            gt_idx: 0,
            lt_idx: 0,
            return_sites: HashMap::new(),
            unit: String::new(),
        }
    }

    /// Set the unit name before translating each input file.
    pub fn set_unit(&mut self, unit: &str) {
        self.unit = unit.to_string();
    }

    /// Consume the writer, yielding the emitted buffer.
    pub fn into_output(self) -> String {
        self.buf
    }

    /// Translate one classified command into its instruction template.
    pub fn write_command(&mut self, cmd: &Command) {
        self.emit(&format!("// {cmd}"));
        match cmd {
            Command::Arith(op) => self.arith(*op),
            Command::Mem {
                dir: Direction::Push,
                segment,
                index,
            } => self.push(*segment, *index),
            Command::Mem {
                dir: Direction::Pop,
                segment,
                index,
            } => self.pop(*segment, *index),
            Command::Branch {
                kind: BranchKind::Label,
                target,
            } => self.emit(&format!("({target})")),
            Command::Branch {
                kind: BranchKind::Goto,
                target,
            } => {
                self.emit(&format!("@{target}"));
                self.emit("0;JMP");
            }
            Command::Branch {
                kind: BranchKind::IfGoto,
                target,
            } => {
                self.pop_d();
                self.emit(&format!("@{target}"));
                self.emit("D;JNE");
            }
            Command::Func {
                kind: FuncKind::Function,
                name,
                count,
            } => self.function(name, *count),
            Command::Func {
                kind: FuncKind::Call,
                name,
                count,
            } => self.call(name, *count),
            Command::Return => self.ret(),
        }
    }

    /// Emit the program prologue: `SP = 256`, then `call Sys.init 0`.
    pub fn bootstrap(&mut self) {
        self.emit("@256");
        self.emit("D=A");
        self.emit("@SP");
        self.emit("M=D");
        self.emit("// call Sys.init 0");
        self.call("Sys.init", 0);
    }

    fn emit(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    // Stack primitives. The stack grows upward; SP holds the next free slot.

    /// Push D: `RAM[SP] = D; SP += 1`.
    fn push_d(&mut self) {
        self.emit("@SP");
        self.emit("AM=M+1");
        self.emit("A=A-1");
        self.emit("M=D");
    }

    /// Pop into D: `SP -= 1; D = RAM[SP]`.
    fn pop_d(&mut self) {
        self.emit("@SP");
        self.emit("AM=M-1");
        self.emit("D=M");
    }

    // Arithmetic and logic

    fn arith(&mut self, op: Opcode) {
        match op {
            Opcode::Add => self.binary("M=D+M"),
            Opcode::Sub => self.binary("M=M-D"),
            Opcode::And => self.binary("M=D&M"),
            Opcode::Or => self.binary("M=D|M"),
            Opcode::Neg => self.unary("M=-M"),
            Opcode::Not => self.unary("M=!M"),
            Opcode::Eq => {
                self.eq_idx += 1;
                self.compare("EQ", self.eq_idx, "JEQ");
            }
            Opcode::Gt => {
                self.gt_idx += 1;
                self.compare("GT", self.gt_idx, "JGT");
            }
            Opcode::Lt => {
                self.lt_idx += 1;
                self.compare("LT", self.lt_idx, "JLT");
            }
        }
    }

    /// Pop y into D, address x, combine in place.
    fn binary(&mut self, combine: &str) {
        self.pop_d();
        self.emit("A=A-1");
        self.emit(combine);
    }

    /// Rewrite the top of stack in place.
    fn unary(&mut self, rewrite: &str) {
        self.emit("@SP");
        self.emit("A=M-1");
        self.emit(rewrite);
    }

    /// Compute `D = x - y`, assume true, jump past the false write when the
    /// condition holds. One fresh label per occurrence.
    fn compare(&mut self, family: &str, k: u32, jump: &str) {
        self.pop_d();
        self.emit("A=A-1");
        self.emit("D=M-D");
        self.emit("M=-1");
        self.emit(&format!("@{family}_{k}"));
        self.emit(&format!("D;{jump}"));
        self.emit("@SP");
        self.emit("A=M-1");
        self.emit("M=0");
        self.emit(&format!("({family}_{k})"));
    }

    // Memory access

    fn push(&mut self, segment: Segment, index: u16) {
        match segment.access() {
            Access::Immediate => {
                self.emit(&format!("@{index}"));
                self.emit("D=A");
            }
            Access::Indirect(base) => {
                self.emit(&format!("@{index}"));
                self.emit("D=A");
                self.emit(&format!("@{base}"));
                self.emit("A=D+M");
                self.emit("D=M");
            }
            Access::Temp => {
                self.emit(&format!("@{}", TEMP_BASE + index));
                self.emit("D=M");
            }
            Access::Pointer => {
                self.emit(&format!("@{}", pointer_symbol(index)));
                self.emit("D=M");
            }
            Access::Static => {
                self.emit(&format!("@{}.{index}", self.unit));
                self.emit("D=M");
            }
        }
        self.push_d();
    }

    fn pop(&mut self, segment: Segment, index: u16) {
        match segment.access() {
            // `pop constant` is rejected by the classifier.
            Access::Immediate => {}
            Access::Indirect(base) => {
                // Stage the effective address in R13 so the pop can use D.
                self.emit(&format!("@{index}"));
                self.emit("D=A");
                self.emit(&format!("@{base}"));
                self.emit("D=D+M");
                self.emit("@R13");
                self.emit("M=D");
                self.pop_d();
                self.emit("@R13");
                self.emit("A=M");
                self.emit("M=D");
            }
            Access::Temp => {
                self.pop_d();
                self.emit(&format!("@{}", TEMP_BASE + index));
                self.emit("M=D");
            }
            Access::Pointer => {
                self.pop_d();
                self.emit(&format!("@{}", pointer_symbol(index)));
                self.emit("M=D");
            }
            Access::Static => {
                self.pop_d();
                self.emit(&format!("@{}.{index}", self.unit));
                self.emit("M=D");
            }
        }
    }

    // Function linkage

    /// `(f)` followed by one zero push per local.
    fn function(&mut self, name: &str, locals: u16) {
        self.emit(&format!("({name})"));
        for _ in 0..locals {
            self.emit("@SP");
            self.emit("AM=M+1");
            self.emit("A=A-1");
            self.emit("M=0");
        }
    }

    /// Push the return site and the caller frame, reposition ARG and LCL,
    /// jump to the callee, declare the return site.
    fn call(&mut self, name: &str, args: u16) {
        let site = self.return_site(name);

        self.emit(&format!("@{site}"));
        self.emit("D=A");
        self.push_d();

        for cell in ["LCL", "ARG", "THIS", "THAT"] {
            self.emit(&format!("@{cell}"));
            self.emit("D=M");
            self.push_d();
        }

        // ARG = SP - args - 5; the offset can exceed u16
        self.emit("@SP");
        self.emit("D=M");
        self.emit(&format!("@{}", u32::from(args) + 5));
        self.emit("D=D-A");
        self.emit("@ARG");
        self.emit("M=D");

        // LCL = SP
        self.emit("@SP");
        self.emit("D=M");
        self.emit("@LCL");
        self.emit("M=D");

        self.emit(&format!("@{name}"));
        self.emit("0;JMP");
        self.emit(&format!("({site})"));
    }

    /// Fresh `<callee>$ret.<k>` symbol, counter bumped before use.
    fn return_site(&mut self, callee: &str) -> String {
        let k = self.return_sites.entry(callee.to_string()).or_insert(0);
        *k += 1;
        format!("{callee}$ret.{k}")
    }

    /// The six-step epilogue. The return address is saved to R14 before the
    /// return value is popped into `RAM[ARG]`: with zero arguments the two
    /// cells coincide.
    fn ret(&mut self) {
        // endFrame = LCL
        self.emit("@LCL");
        self.emit("D=M");
        self.emit("@R13");
        self.emit("M=D");

        // retAddr = RAM[endFrame - 5]
        self.emit("@5");
        self.emit("A=D-A");
        self.emit("D=M");
        self.emit("@R14");
        self.emit("M=D");

        // RAM[ARG] = pop()
        self.pop_d();
        self.emit("@ARG");
        self.emit("A=M");
        self.emit("M=D");

        // SP = ARG + 1
        self.emit("@ARG");
        self.emit("D=M+1");
        self.emit("@SP");
        self.emit("M=D");

        // Restore the caller frame, walking endFrame downward.
        for cell in ["THAT", "THIS", "ARG", "LCL"] {
            self.emit("@R13");
            self.emit("AM=M-1");
            self.emit("D=M");
            self.emit(&format!("@{cell}"));
            self.emit("M=D");
        }

        // goto retAddr
        self.emit("@R14");
        self.emit("A=M");
        self.emit("0;JMP");
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::classify_line;

    fn write(lines: &[&str]) -> String {
        let mut writer = CodeWriter::new();
        writer.set_unit("Test");
        for line in lines {
            let cmd = classify_line(line, 1, "Test").unwrap().unwrap();
            writer.write_command(&cmd);
        }
        writer.into_output()
    }

    #[test]
    fn add_pops_y_and_combines_in_place() {
        let asm = write(&["add"]);
        assert!(asm.contains("// add"));
        assert!(asm.contains("@SP\nAM=M-1\nD=M\nA=A-1\nM=D+M"));
    }

    #[test]
    fn sub_preserves_operand_order() {
        let asm = write(&["sub"]);
        assert!(asm.contains("M=M-D"));
    }

    #[test]
    fn unary_ops_rewrite_top_of_stack() {
        assert!(write(&["neg"]).contains("@SP\nA=M-1\nM=-M"));
        assert!(write(&["not"]).contains("@SP\nA=M-1\nM=!M"));
    }

    #[test]
    fn comparison_labels_are_fresh_per_occurrence() {
        let asm = write(&["eq", "eq", "gt", "lt"]);
        assert!(asm.contains("@EQ_1"));
        assert!(asm.contains("(EQ_1)"));
        assert!(asm.contains("@EQ_2"));
        assert!(asm.contains("(EQ_2)"));
        // Families count independently.
        assert!(asm.contains("(GT_1)"));
        assert!(asm.contains("(LT_1)"));
        assert!(!asm.contains("(GT_2)"));
    }

    #[test]
    fn comparison_writes_boolean_convention() {
        let asm = write(&["lt"]);
        assert!(asm.contains("D=M-D\nM=-1\n@LT_1\nD;JLT"));
        assert!(asm.contains("@SP\nA=M-1\nM=0\n(LT_1)"));
    }

    #[test]
    fn push_constant_loads_literal() {
        let asm = write(&["push constant 7"]);
        assert!(asm.contains("@7\nD=A\n@SP\nAM=M+1\nA=A-1\nM=D"));
    }

    #[test]
    fn push_indirect_adds_index_to_base() {
        let asm = write(&["push local 3"]);
        assert!(asm.contains("@3\nD=A\n@LCL\nA=D+M\nD=M"));
    }

    #[test]
    fn pop_indirect_stages_address_in_r13() {
        let asm = write(&["pop argument 2"]);
        assert!(asm.contains("@2\nD=A\n@ARG\nD=D+M\n@R13\nM=D"));
        assert!(asm.contains("@R13\nA=M\nM=D"));
    }

    #[test]
    fn temp_is_direct_at_base_five() {
        assert!(write(&["push temp 4"]).contains("@9\nD=M"));
        assert!(write(&["pop temp 0"]).contains("@5\nM=D"));
    }

    #[test]
    fn pointer_aliases_this_and_that() {
        assert!(write(&["push pointer 0"]).contains("@THIS\nD=M"));
        assert!(write(&["pop pointer 1"]).contains("@THAT\nM=D"));
    }

    #[test]
    fn static_is_qualified_by_unit() {
        let asm = write(&["push static 3", "pop static 3"]);
        assert!(asm.contains("@Test.3\nD=M"));
        assert!(asm.contains("@Test.3\nM=D"));
    }

    #[test]
    fn label_is_emitted_verbatim() {
        let asm = write(&["label LOOP"]);
        assert!(asm.contains("(LOOP)\n"));
        assert!(!asm.contains("$LOOP"));
    }

    #[test]
    fn goto_jumps_unconditionally() {
        assert!(write(&["goto END"]).contains("@END\n0;JMP"));
    }

    #[test]
    fn if_goto_pops_and_jumps_on_nonzero() {
        let asm = write(&["if-goto LOOP"]);
        assert!(asm.contains("@SP\nAM=M-1\nD=M\n@LOOP\nD;JNE"));
    }

    #[test]
    fn function_initializes_exactly_n_locals() {
        let asm = write(&["function Foo.bar 3"]);
        assert!(asm.contains("(Foo.bar)"));
        assert_eq!(asm.matches("M=0").count(), 3);

        let none = write(&["function Foo.baz 0"]);
        assert!(!none.contains("M=0"));
    }

    #[test]
    fn call_emits_frame_and_return_site() {
        let asm = write(&["call Foo.bar 2"]);
        assert!(asm.contains("@Foo.bar$ret.1\nD=A"));
        assert!(asm.contains("@LCL\nD=M"));
        assert!(asm.contains("@THAT\nD=M"));
        // ARG = SP - 2 - 5
        assert!(asm.contains("@7\nD=D-A\n@ARG\nM=D"));
        assert!(asm.contains("@SP\nD=M\n@LCL\nM=D"));
        assert!(asm.contains("@Foo.bar\n0;JMP\n(Foo.bar$ret.1)"));
    }

    #[test]
    fn call_with_max_args_does_not_overflow_the_offset() {
        let asm = write(&["call Foo.bar 65535"]);
        assert!(asm.contains("@65540\nD=D-A\n@ARG\nM=D"));
    }

    #[test]
    fn return_sites_count_per_callee() {
        let asm = write(&["call Foo.bar 0", "call Foo.bar 0", "call Foo.baz 0"]);
        assert!(asm.contains("(Foo.bar$ret.1)"));
        assert!(asm.contains("(Foo.bar$ret.2)"));
        assert!(asm.contains("(Foo.baz$ret.1)"));
        assert!(!asm.contains("(Foo.baz$ret.2)"));
    }

    #[test]
    fn return_saves_ret_addr_before_popping_result() {
        let asm = write(&["return"]);
        let save = asm.find("@5\nA=D-A\nD=M\n@R14\nM=D").expect("retAddr save");
        let pop = asm.find("@ARG\nA=M\nM=D").expect("result store");
        assert!(save < pop);
        assert!(asm.contains("@ARG\nD=M+1\n@SP\nM=D"));
        assert!(asm.contains("@R14\nA=M\n0;JMP"));
    }

    #[test]
    fn return_restores_frame_in_order() {
        let asm = write(&["return"]);
        let that = asm.find("@THAT\nM=D").unwrap();
        let this = asm.find("@THIS\nM=D").unwrap();
        let lcl = asm.rfind("@LCL\nM=D").unwrap();
        assert!(that < this && this < lcl);
    }

    #[test]
    fn bootstrap_sets_sp_then_calls_sys_init() {
        let mut writer = CodeWriter::new();
        writer.bootstrap();
        let asm = writer.into_output();
        assert!(asm.starts_with("@256\nD=A\n@SP\nM=D\n"));
        assert!(asm.contains("@Sys.init$ret.1\nD=A"));
        assert!(asm.contains("@Sys.init\n0;JMP"));
        assert!(asm.contains("(Sys.init$ret.1)"));
        // Zero arguments: ARG = SP - 5
        assert!(asm.contains("@5\nD=D-A\n@ARG\nM=D"));
    }

    #[test]
    fn comment_precedes_each_template() {
        let asm = write(&["push constant 1", "pop temp 0"]);
        assert!(asm.contains("// push constant 1\n@1"));
        assert!(asm.contains("// pop temp 0\n@SP"));
    }
}

//! Regression tests for bug fixes.
//!
//! Each test documents a specific defect in earlier swap and hazard code,
//! ensuring the fix is never accidentally reverted.

use asm_morph::{
    apply_change, build_horizontal_change, instruction_set_from_sources, load_instruction,
    load_program, print_instruction, print_program, read_places, undo_last_change,
    written_places, BoundaryMode, Change, Flags, Gpr, HighByte, InstructionSet, MemoryRef,
    Operand, Places, Position, RawOperand, Scale,
};

const OPS: &str = "\
ADD32 00000000 00000000 0000000 0 0 00000000 00000000 1111101 0 0 in r i4 m4 io r m4
ADC32 00000000 00000000 1000000 0 0 00000000 00000000 1111101 0 0 in r i4 io r
LOAD 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in m8 out r
MOVH 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in h out h
SCAS 10000001 00000000 0000010 0 0 00000001 00000000 1111101 0 0 in* RDI 8
SHIFTI 00000000 00000000 0000000 0 0 00000000 00000000 1111101 0 0 in i1 io r
";

fn isa() -> InstructionSet {
    let _ = env_logger::builder().is_test(true).try_init();
    instruction_set_from_sources(&[(OPS, "regression.isa")]).unwrap()
}

fn rax_rcx(isa: &InstructionSet, src: &str, index: usize) -> (String, Change) {
    let original = load_program(isa, src).unwrap();
    let change: Change = build_horizontal_change(
        &original,
        isa,
        index,
        Position::Register(Gpr::Rax),
        Position::Register(Gpr::Rcx),
    )
    .unwrap()
    .into();
    let mut program = original.clone();
    apply_change(&mut program, isa, &change).unwrap();
    let text = print_program(isa, &program).unwrap();
    undo_last_change(&mut program, isa, &change).unwrap();
    assert_eq!(program, original);
    (text, change)
}

/// Regression: renaming the base register of a memory operand without an
/// index must keep the "no index" sentinel. Clearing the index field with the
/// wrong mask turned `*RAX[8]` into an indexed reference.
#[test]
fn base_rename_keeps_missing_index() {
    let isa = isa();
    let (text, _) = rax_rcx(&isa, "MOV64 RBX RAX\nLOAD *RAX[8] RDX\nMOV64 RBX RCX\n", 1);
    assert!(text.contains("LOAD *RCX[8] RDX"), "{}", text);

    let raw = Operand::Memory(MemoryRef::based(Gpr::Rcx, 8)).encode();
    assert_eq!(raw.memory_index_field(), Some(16));
    assert_eq!(raw.memory_scale_field(), Some(0));
}

/// Regression: renaming the index register must leave base, scale and
/// displacement bits untouched.
#[test]
fn index_rename_keeps_other_fields() {
    let isa = isa();
    let (text, _) = rax_rcx(&isa, "MOV64 RBX RAX\nLOAD *RSI[4*RAX-12] RDX\nMOV64 RBX RCX\n", 1);
    assert!(text.contains("LOAD *RSI[4*RCX-12] RDX"), "{}", text);

    let mem = MemoryRef {
        base: Some(Gpr::Rsi),
        index: Some((Gpr::Rcx, Scale::Four)),
        disp: -12,
    };
    let raw = Operand::Memory(mem).encode();
    assert_eq!(raw.memory(), Some(mem));
    assert_eq!(raw.memory_base_field(), Some(Gpr::Rsi.index()));
}

/// Regression: negative decimal immediates are stored in two's complement
/// and must not be rejected as too wide for a four-byte slot.
#[test]
fn negative_immediate_is_twos_complement() {
    let isa = isa();
    let inst = load_instruction(&isa, "ADD32 -1 RAX").unwrap();
    assert_eq!(inst.operands[0], Some(Operand::Immediate(0xFFFF_FFFF)));
    assert_eq!(
        print_instruction(&isa, &inst).unwrap(),
        "ADD32 0xFFFFFFFF RAX (1,0)"
    );
    let min = load_instruction(&isa, "ADD32 -2147483648 RAX").unwrap();
    assert_eq!(min.operands[0], Some(Operand::Immediate(0x8000_0000)));
    assert!(load_instruction(&isa, "ADD32 -2147483649 RAX").is_err());
}

/// Regression: a negative immediate never fits a one-byte slot.
#[test]
fn negative_immediate_is_too_wide_for_one_byte() {
    let isa = isa();
    assert!(load_instruction(&isa, "SHIFTI 255 RAX").is_ok());
    assert!(load_instruction(&isa, "SHIFTI 256 RAX").is_err());
    assert!(load_instruction(&isa, "SHIFTI -1 RAX").is_err());
}

/// Regression: high-byte registers printed as their full register, so a
/// copied program did not paste back.
#[test]
fn high_bytes_print_and_reload() {
    let isa = isa();
    let program = load_program(&isa, "MOVH AH DH\nMOVH BH CH\n").unwrap();
    let text = print_program(&isa, &program).unwrap();
    assert_eq!(text, "MOVH AH DH (1,3)\nMOVH BH CH (1,3)\n");
    assert_eq!(load_program(&isa, &text).unwrap(), program);
    assert_eq!(Operand::HighByte(HighByte::Ch).encode(), RawOperand(0x6));
}

/// Regression: the dereference test bound `&&` tighter than intended, so any
/// slot whose pointer matched a position's low bits stopped the scan, even
/// when the slot was an ordinary operand. Only real dereferences of a
/// position may stop it.
#[test]
fn dereference_test_only_applies_to_dereference_slots() {
    let isa = isa();
    // SCAS dereferences RDI and fixes RAX and RBP; swapping RSI and RDX is
    // unaffected.
    let program = load_program(&isa, "ADD32 RSI RDX\nSCAS\nADD32 RDX RSI\n").unwrap();
    let change = build_horizontal_change(
        &program,
        &isa,
        2,
        Position::Register(Gpr::Rsi),
        Position::Register(Gpr::Rdx),
    )
    .unwrap();
    assert_eq!(change.first, 0);

    // Swapping RDI with RDX stops at SCAS.
    let program = load_program(&isa, "ADD32 RDI RDX\nSCAS\nADD32 RDX RDI\n").unwrap();
    let change = build_horizontal_change(
        &program,
        &isa,
        2,
        Position::Register(Gpr::Rdi),
        Position::Register(Gpr::Rdx),
    )
    .unwrap();
    assert_eq!(change.first, 2);
}

/// Regression: flags an opcode always reads must also count as written, so
/// that a reader of the carry flag is never moved across another reader
/// that may clobber it.
#[test]
fn written_places_include_always_read_masks() {
    let isa = isa();
    let inst = load_instruction(&isa, "ADC32 RAX RBX").unwrap();
    let fp = isa.footprint(inst.footprint).unwrap();
    let written = written_places(fp, &inst);
    assert!(written.contains(read_places(fp, &inst) & Places::flags(Flags::CF)));
    assert!(written.contains(Places::flags(Flags::STATUS)));
}

/// Regression: undoing a swap whose window ended in a folded boundary
/// renamed the boundary instruction's inputs back but left its outputs
/// swapped.
#[test]
fn undo_restores_folded_boundaries() {
    let isa = isa();
    let (text, change) = rax_rcx(
        &isa,
        "MOV64 RDX RAX\nMOV64 RSI RCX\nADD32 RAX RCX\nMOV64 RDI RAX\nMOV64 RDI RCX\n",
        2,
    );
    let Change::RegisterSwap(swap) = change else {
        panic!("expected a register swap");
    };
    assert_eq!(swap.at_start, BoundaryMode::None);
    assert_eq!(swap.at_end, BoundaryMode::None);
    assert!(text.starts_with("MOV64 RDX RCX (0,0)\nMOV64 RSI RAX (0,0)\n"), "{}", text);
}

/// Regression: reaching the top of the program with only one direction open
/// inserted a full exchange instead of a single move.
#[test]
fn open_top_uses_remaining_direction() {
    let isa = isa();
    let (text, change) = rax_rcx(&isa, "MOV64 RDX RCX\nADD32 RAX RBX\n", 1);
    let Change::RegisterSwap(swap) = change else {
        panic!("expected a register swap");
    };
    assert_eq!(swap.at_start, BoundaryMode::MoveFirstToSecond);
    assert!(text.starts_with("MOV64 RAX RCX (0,0)\n"), "{}", text);
}

/// Regression: the upward scan ignored reads. A position read above the
/// point where its direction had closed stayed closed, so the boundary moved
/// only one value and the renamed read saw the other register's value.
#[test]
fn upward_scan_reopens_on_read() {
    let _ = env_logger::builder().is_test(true).try_init();
    let isa = instruction_set_from_sources(&[(
        include_str!("../isa/x86_base.isa"),
        "x86_base.isa",
    )])
    .unwrap();
    let program = load_program(
        &isa,
        "IMUL64 RCX RAX\nXOR32 RBX RAX\nMOV64 R8 RCX\nSHLCL64 RCX\n",
    )
    .unwrap();
    let swap = build_horizontal_change(
        &program,
        &isa,
        3,
        Position::Register(Gpr::Rcx),
        Position::Register(Gpr::R8),
    )
    .unwrap();
    assert_eq!(swap.first, 0);
    assert_eq!(swap.at_start, BoundaryMode::Swap);

    // Reading CH and writing RCX in one instruction keeps RCX live above it.
    let program = load_program(&isa, "MOVZX8 CH RCX\n").unwrap();
    let swap = build_horizontal_change(
        &program,
        &isa,
        1,
        Position::Register(Gpr::Rcx),
        Position::Register(Gpr::Rax),
    )
    .unwrap();
    assert_eq!(swap.at_start, BoundaryMode::Swap);
    let mut edited = program.clone();
    apply_change(&mut edited, &isa, &swap.into()).unwrap();
    assert_eq!(
        print_program(&isa, &edited).unwrap(),
        "XCHG64 RCX RAX (0,1)\nMOVZX8 AH RAX (1,17)\nXCHG64 RCX RAX (0,1)\n"
    );
}

#![no_main]
use libfuzzer_sys::fuzz_target;

use asm_morph::{Gpr, Position};

const X86_BASE: &str = include_str!("../../crates/asm-morph/isa/x86_base.isa");

fuzz_target!(|data: &str| {
    // Loading arbitrary text must never panic, only return Ok/Err.
    let Ok(isa) = asm_morph::instruction_set_from_sources(&[(X86_BASE, "x86_base.isa")]) else {
        return;
    };
    let Ok(program) = asm_morph::load_program(&isa, data) else {
        return;
    };

    // Anything that loads prints back to the same program.
    let text = asm_morph::print_program(&isa, &program).unwrap();
    assert_eq!(asm_morph::load_program(&isa, &text).unwrap(), program);

    // Every change built from it applies and undoes exactly.
    let len = program.len();
    for index in 0..=len {
        let change: asm_morph::Change = asm_morph::build_horizontal_change(
            &program,
            &isa,
            index,
            Position::Register(Gpr::Rax),
            Position::Register(Gpr::Rcx),
        )
        .unwrap()
        .into();
        let mut edited = program.clone();
        asm_morph::apply_change(&mut edited, &isa, &change).unwrap();
        asm_morph::undo_last_change(&mut edited, &isa, &change).unwrap();
        assert_eq!(edited, program);

        if index < len {
            let change: asm_morph::Change = asm_morph::build_vertical_change(&program, &isa, index, -(index as isize))
                .unwrap()
                .into();
            asm_morph::apply_change(&mut edited, &isa, &change).unwrap();
            asm_morph::undo_last_change(&mut edited, &isa, &change).unwrap();
            assert_eq!(edited, program);
        }
    }
});

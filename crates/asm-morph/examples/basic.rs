//! Basic editing example: load an instruction set and a program, then
//! reorder an instruction and swap two registers with undo.
//!
//! Run with: `cargo run --example basic`

use asm_morph::{
    build_horizontal_change, build_vertical_change, load_instruction_set, Gpr, MorphError,
    Position, Session,
};

const PROGRAM: &str = "\
LOAD64 *RSI[0] RAX
LOAD64 *RSI[8] RCX
ADD32 RAX RCX
STORE64 RCX *RDI[0]
MOV64 RDX R8
INC64 R9
";

fn main() -> Result<(), MorphError> {
    env_logger::init();
    println!("=== asm_morph basic example ===\n");

    let isa_path = concat!(env!("CARGO_MANIFEST_DIR"), "/isa/x86_base.isa");
    let isa = load_instruction_set(&[isa_path])?;
    let mut session = Session::new(isa);
    session.paste_text(PROGRAM)?;
    println!("1. Loaded program:");
    print_text(&session.copy_text()?);

    // --- Reorder ---
    let wanted = -4;
    let reorder = build_vertical_change(session.program(), session.isa(), 4, wanted)?;
    println!(
        "\n2. Moving instruction 4 by {} is clamped to {}:",
        wanted, reorder.displacement
    );
    session.preview_move(4, wanted)?;
    session.commit();
    print_text(&session.copy_text()?);

    // --- Register swap ---
    let (rax, rcx) = (Position::Register(Gpr::Rax), Position::Register(Gpr::Rcx));
    let index = 3;
    let swap = build_horizontal_change(session.program(), session.isa(), index, rax, rcx)?;
    println!(
        "\n3. Swapping {} and {} at {} renames {:?} (start {:?}, end {:?}):",
        rax,
        rcx,
        index,
        swap.window(),
        swap.at_start,
        swap.at_end
    );
    session.preview_register_swap(index, rax, rcx)?;
    session.commit();
    print_text(&session.copy_text()?);

    // --- Undo ---
    session.undo()?;
    session.undo()?;
    println!("\n4. After two undos:");
    print_text(&session.copy_text()?);
    Ok(())
}

fn print_text(text: &str) {
    for line in text.lines() {
        println!("   {}", line);
    }
}

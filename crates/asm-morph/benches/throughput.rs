//! Performance benchmarks for `asm_morph`.
//!
//! Measures:
//! - ISA description parsing
//! - Program loading and printing throughput (bytes of source text)
//! - Hazard checks over adjacent pairs
//! - Register-swap and reorder builds on long programs
//! - Apply/undo round trips
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use asm_morph::{
    apply_change, build_horizontal_change, build_vertical_change, can_swap_instructions,
    instruction_set_from_sources, load_program, print_program, undo_last_change, Change, Gpr,
    InstructionSet, Position, SimdReg,
};

const X86_BASE: &str = include_str!("../isa/x86_base.isa");

fn isa() -> InstructionSet {
    instruction_set_from_sources(&[(X86_BASE, "x86_base.isa")]).unwrap()
}

/// A straight-line block mixing arithmetic, memory and vector code,
/// repeated `n` times.
fn program_text(n: usize) -> String {
    let block = "\
LOAD64 *RSI[0] RAX
LOAD64 *RSI[8] RCX
ADD32 RAX RCX
MOV64 RCX RDX
LEA64 *RDX[4*RBX+16] R8
STORE64 R8 *RDI[0]
PADDD XMM1 XMM2
MOVDQU XMM2 XMM3
INC64 R9
MOV64 R9 R10
";
    block.repeat(n)
}

// ─── ISA Parsing ─────────────────────────────────────────────────────────────

fn bench_isa(c: &mut Criterion) {
    let mut group = c.benchmark_group("isa");
    group.throughput(Throughput::Bytes(X86_BASE.len() as u64));
    group.bench_function("parse_x86_base", |b| {
        b.iter(|| instruction_set_from_sources(black_box(&[(X86_BASE, "x86_base.isa")])).unwrap())
    });
    group.finish();
}

// ─── Program Text ────────────────────────────────────────────────────────────

fn bench_program_text(c: &mut Criterion) {
    let isa = isa();
    let mut group = c.benchmark_group("program_text");
    for n in [10usize, 100, 1000] {
        let text = program_text(n);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("load_{}_instructions", n * 10), |b| {
            b.iter(|| load_program(&isa, black_box(&text)).unwrap())
        });
        let program = load_program(&isa, &text).unwrap();
        group.bench_function(format!("print_{}_instructions", n * 10), |b| {
            b.iter(|| print_program(&isa, black_box(&program)).unwrap())
        });
    }
    group.finish();
}

// ─── Hazards ─────────────────────────────────────────────────────────────────

fn bench_hazards(c: &mut Criterion) {
    let isa = isa();
    let program = load_program(&isa, &program_text(100)).unwrap();
    let insts = program.instructions();
    let mut group = c.benchmark_group("hazards");
    group.throughput(Throughput::Elements(insts.len() as u64 - 1));
    group.bench_function("adjacent_pairs", |b| {
        b.iter(|| {
            insts
                .windows(2)
                .filter(|w| can_swap_instructions(&isa, black_box(&w[0]), black_box(&w[1])))
                .count()
        })
    });
    group.finish();
}

// ─── Change Builds ───────────────────────────────────────────────────────────

fn bench_builds(c: &mut Criterion) {
    let isa = isa();
    let mut group = c.benchmark_group("builds");

    // R11/R12 never appear, so the scans run the whole program.
    let program = load_program(&isa, &program_text(1000)).unwrap();
    let mid = program.len() / 2;
    group.bench_function("swap_full_scan_10k", |b| {
        b.iter(|| {
            build_horizontal_change(
                &program,
                &isa,
                black_box(mid),
                Position::Register(Gpr::R11),
                Position::Register(Gpr::R12),
            )
            .unwrap()
        })
    });

    group.bench_function("swap_short_window", |b| {
        b.iter(|| {
            build_horizontal_change(
                &program,
                &isa,
                black_box(mid + 3),
                Position::Register(Gpr::Rcx),
                Position::Register(Gpr::Rdx),
            )
            .unwrap()
        })
    });

    let moves = load_program(&isa, &"MOV64 RAX RBX\n".repeat(2000)).unwrap();
    group.bench_function("reorder_2000_places", |b| {
        b.iter(|| build_vertical_change(&moves, &isa, black_box(0), 1999).unwrap())
    });
    group.finish();
}

// ─── Apply / Undo ────────────────────────────────────────────────────────────

fn bench_apply_undo(c: &mut Criterion) {
    let isa = isa();
    let mut program = load_program(&isa, &program_text(100)).unwrap();
    let x = |n| Position::Simd(SimdReg::new(n).unwrap());
    let swap: Change = build_horizontal_change(&program, &isa, 500, x(1), x(2))
        .unwrap()
        .into();
    let reorder: Change = build_vertical_change(&program, &isa, 0, 500).unwrap().into();

    let mut group = c.benchmark_group("apply_undo");
    group.bench_function("vector_swap", |b| {
        b.iter(|| {
            apply_change(&mut program, &isa, black_box(&swap)).unwrap();
            undo_last_change(&mut program, &isa, black_box(&swap)).unwrap();
        })
    });
    group.bench_function("reorder", |b| {
        b.iter(|| {
            apply_change(&mut program, &isa, black_box(&reorder)).unwrap();
            undo_last_change(&mut program, &isa, black_box(&reorder)).unwrap();
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_isa,
    bench_program_text,
    bench_hazards,
    bench_builds,
    bench_apply_undo
);
criterion_main!(benches);

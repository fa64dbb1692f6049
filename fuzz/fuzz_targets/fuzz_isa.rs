#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing an arbitrary description must never panic, only return Ok/Err.
    let Ok(ext) = asm_morph::isa::parse_extension(data, "fuzz.isa") else {
        return;
    };

    // Every parsed footprint prints to a line that parses back to itself.
    let mut isa = asm_morph::InstructionSet::new();
    let Ok(id) = isa.push_extension(ext) else {
        return;
    };
    let count = isa.extension(id).map_or(0, |e| e.len());
    for index in 0..count as u32 {
        let fid = asm_morph::FootprintId::new(id, index);
        let line = isa.print_footprint(fid).unwrap();
        let reparsed = asm_morph::isa::parse_extension(&line, "printed.isa").unwrap();
        let mut expected = *isa.footprint(fid).unwrap();
        expected.name = 0;
        assert_eq!(reparsed.footprint(0), Some(&expected));
    }
});

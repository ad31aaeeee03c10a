use proptest::prelude::*;
use tinycpu::virtual_machine::assembler::assemble_source;
use tinycpu::virtual_machine::program::Program;
use tinycpu::virtual_machine::vm::{MachineConfig, VM};

const MNEMONICS: &[&str] = &[
    "add", "sub", "mul", "div", "eq", "neq", "gt", "gte", "lt", "lte",
];

fn operand() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..4).prop_map(|r| format!("r{r}")),
        (-100i32..100, 0u32..100).prop_map(|(whole, frac)| format!("{whole}.{frac}")),
        Just("sp".to_string()),
    ]
}

fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0..MNEMONICS.len(), 0u32..4, operand(), operand())
            .prop_map(|(op, dst, a, b)| format!("{} r{dst} {a} {b}", MNEMONICS[op])),
        1 => (0u32..4, operand()).prop_map(|(dst, a)| format!("mov r{dst} {a}")),
        1 => (0u32..4).prop_map(|dst| format!("push r{dst}")),
        1 => (0u32..4).prop_map(|dst| format!("pop r{dst}")),
        1 => (0u32..4).prop_map(|dst| format!("inc r{dst}")),
    ]
}

fn run_fresh(program: &Program) -> (bool, Vec<u32>, Vec<u32>, usize) {
    let mut vm = VM::new(MachineConfig::fitting(program));
    let ok = vm.run(program, None).is_ok();
    // Compare bit patterns so -0.0 and 0.0 are told apart.
    let regs = vm.registers().iter().map(|v| v.to_bits()).collect();
    let stack = vm.stack().iter().map(|v| v.to_bits()).collect();
    (ok, regs, stack, vm.stack_pointer())
}

proptest! {
    #[test]
    fn fresh_machines_agree(lines in prop::collection::vec(line(), 1..40)) {
        let source = lines.join("\n");
        let program = assemble_source(&source).unwrap();
        prop_assert_eq!(run_fresh(&program), run_fresh(&program), "source:\n{}", source);
    }

    #[test]
    fn text_encoding_preserves_behaviour(lines in prop::collection::vec(line(), 1..20)) {
        let program = assemble_source(&lines.join("\n")).unwrap();
        let decoded = Program::from_text(&program.to_text()).unwrap();
        prop_assert_eq!(&decoded, &program);
        prop_assert_eq!(run_fresh(&decoded), run_fresh(&program));
    }
}

//! JSON-driven state-transition vectors.
//!
//! Each case is an encoded program plus the full register/memory state
//! expected after stepping; the harness applies the initial state, steps,
//! and compares everything the case lists.

use dcpu16::Dcpu;
use serde::Deserialize;

#[derive(Deserialize)]
struct TestCase {
    name: String,
    #[serde(default = "one")]
    steps: u64,
    initial: MachineState,
    #[serde(rename = "final")]
    final_state: MachineState,
}

#[derive(Deserialize)]
struct MachineState {
    #[serde(default)]
    pc: u16,
    #[serde(default)]
    sp: u16,
    #[serde(default)]
    ex: u16,
    #[serde(default)]
    regs: [u16; 8],
    #[serde(default)]
    ram: Vec<(u16, u16)>,
    #[serde(default)]
    cycles: u64,
}

fn one() -> u64 {
    1
}

const VECTORS: &str = r#"[
  {
    "name": "SET A, 0x0030",
    "initial": {"ram": [[0, 31745], [1, 48]]},
    "final": {"pc": 2, "regs": [48, 0, 0, 0, 0, 0, 0, 0], "cycles": 2}
  },
  {
    "name": "ADD A, 0x0002 carries into EX",
    "initial": {"regs": [65535, 0, 0, 0, 0, 0, 0, 0], "ram": [[0, 35842]]},
    "final": {"pc": 1, "ex": 1, "regs": [1, 0, 0, 0, 0, 0, 0, 0], "cycles": 2}
  },
  {
    "name": "DIV A, B by zero",
    "initial": {"regs": [10, 0, 0, 0, 0, 0, 0, 0], "ram": [[0, 1030]]},
    "final": {"pc": 1, "regs": [0, 0, 0, 0, 0, 0, 0, 0], "cycles": 3}
  },
  {
    "name": "SHL A, 0x0004",
    "initial": {"regs": [4660, 0, 0, 0, 0, 0, 0, 0], "ram": [[0, 37903]]},
    "final": {"pc": 1, "ex": 1, "regs": [9024, 0, 0, 0, 0, 0, 0, 0], "cycles": 1}
  },
  {
    "name": "SET PUSH, 0x1234",
    "initial": {"ram": [[0, 32513], [1, 4660]]},
    "final": {"pc": 2, "sp": 65535, "ram": [[65535, 4660]], "cycles": 2}
  },
  {
    "name": "SET A, POP",
    "initial": {"sp": 65535, "ram": [[0, 24577], [65535, 511]]},
    "final": {"pc": 1, "sp": 0, "regs": [511, 0, 0, 0, 0, 0, 0, 0], "cycles": 1}
  },
  {
    "name": "IFE failure skips one instruction",
    "steps": 2,
    "initial": {"regs": [1, 0, 0, 0, 0, 0, 0, 0], "ram": [[0, 35858], [1, 38913], [2, 40993]]},
    "final": {"pc": 3, "regs": [1, 7, 0, 0, 0, 0, 0, 0], "cycles": 4}
  },
  {
    "name": "SUB A, 0x0002 borrows into EX",
    "initial": {"regs": [1, 0, 0, 0, 0, 0, 0, 0], "ram": [[0, 35843]]},
    "final": {"pc": 1, "ex": 65535, "regs": [65535, 0, 0, 0, 0, 0, 0, 0], "cycles": 2}
  },
  {
    "name": "MLI A, 0x0003 is signed",
    "initial": {"regs": [65534, 0, 0, 0, 0, 0, 0, 0], "ram": [[0, 36869]]},
    "final": {"pc": 1, "ex": 65535, "regs": [65530, 0, 0, 0, 0, 0, 0, 0], "cycles": 2}
  },
  {
    "name": "JSR 0x000a pushes the return address",
    "initial": {"ram": [[0, 31776], [1, 10]]},
    "final": {"pc": 10, "sp": 65535, "ram": [[65535, 2]], "cycles": 5}
  }
]"#;

#[test]
fn state_transition_vectors() {
    let cases: Vec<TestCase> = serde_json::from_str(VECTORS).expect("vector JSON parses");
    assert!(!cases.is_empty());

    for case in &cases {
        let mut cpu = Dcpu::new();
        cpu.regs.pc = case.initial.pc;
        cpu.regs.sp = case.initial.sp;
        cpu.regs.ex = case.initial.ex;
        cpu.regs.gp = case.initial.regs;
        for &(addr, value) in &case.initial.ram {
            cpu.poke(addr, value);
        }

        for _ in 0..case.steps {
            cpu.step();
        }

        let expected = &case.final_state;
        assert_eq!(cpu.regs.pc, expected.pc, "{}: PC", case.name);
        assert_eq!(cpu.regs.sp, expected.sp, "{}: SP", case.name);
        assert_eq!(cpu.regs.ex, expected.ex, "{}: EX", case.name);
        assert_eq!(cpu.regs.gp, expected.regs, "{}: registers", case.name);
        assert_eq!(cpu.cycles(), expected.cycles, "{}: cycles", case.name);
        for &(addr, value) in &expected.ram {
            assert_eq!(cpu.peek(addr), value, "{}: [{addr:#06x}]", case.name);
        }
    }
}

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

use okvm::{Instruction, Opcode, Width};

fn op(opcode: Opcode, width: Width) -> u8 {
    Instruction::new(opcode, width).encode()
}

/// Writes a ROM to a temporary file, which is deleted when dropped
fn write_rom(rom: &[u8]) -> NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".rom")
        .tempfile()
        .expect("failed to create ROM file");
    f.write_all(rom).expect("failed to write ROM");
    f
}

fn okmin(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_okmin"))
        .args(args)
        .env("OKVM_LOG", "off")
        .output()
        .expect("failed to run okmin")
}

fn hello_rom() -> Vec<u8> {
    let [_, a0, a1, a2] = okvm_devices::PORT_STDOUT.to_be_bytes();
    let mut rom = vec![];
    for &c in b"hi" {
        rom.extend([op(Opcode::Lit, Width::W1), c]);
        rom.extend([op(Opcode::Lit, Width::W3), a0, a1, a2]);
        rom.push(op(Opcode::Str, Width::W1));
        rom.extend([op(Opcode::Lit, Width::W1), okvm_devices::STDOUT]);
        rom.push(op(Opcode::Int, Width::W1));
        rom.push(op(Opcode::Drp, Width::W1));
    }
    rom.push(Instruction::HALT);
    rom
}

#[test]
fn hello() {
    let rom = write_rom(&hello_rom());
    let out = okmin(&[rom.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(out.stdout, b"hi");
}

#[test]
fn version() {
    let out = okmin(&["-v"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "{stdout}");

    let rom = write_rom(&hello_rom());
    let out = okmin(&["-v", rom.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
    assert!(out.stdout.ends_with(b"hi"));
}

#[test]
fn panic() {
    let rom = [op(Opcode::Lit, Width::W1), 0x7f, op(Opcode::Int, Width::W1)];
    let rom = write_rom(&rom);
    let out = okmin(&[rom.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn missing_rom() {
    let out = okmin(&["/this/rom/does/not/exist.rom"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("failed to load"), "{stderr}");
}

#[test]
fn oversized_rom() {
    let rom = write_rom(&[0u8; 257]);
    let out = okmin(&["--word-size", "1", rom.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));

    let rom = write_rom(&[0u8; 256]);
    let out = okmin(&["--word-size", "1", rom.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn max_ticks() {
    // Jumps back to address 0 forever
    let rom = [op(Opcode::Lit, Width::W1), 0x00, op(Opcode::Jmp, Width::W1)];
    let rom = write_rom(&rom);
    let out = okmin(&["--max-ticks", "100", rom.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn max_ticks_budget() {
    let rom = write_rom(&hello_rom());
    let path = rom.path().to_str().unwrap();

    // Nothing runs with a zero budget
    let out = okmin(&["--max-ticks", "0", path]);
    assert_eq!(out.status.code(), Some(3));
    assert!(out.stdout.is_empty());

    // Two characters of six instructions each, then HALT
    let out = okmin(&["--max-ticks", "13", path]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(out.stdout, b"hi");

    let out = okmin(&["--max-ticks", "12", path]);
    assert_eq!(out.status.code(), Some(3));
    assert_eq!(out.stdout, b"hi");
}

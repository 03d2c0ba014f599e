//! Constant-pool layout: `.name value` definitions to RAM bytes plus a
//! parallel `constants[i] -> ram address` table.

use litavm_asm::register;

use super::lexer::{LineKind, SourceLine};
use crate::consts::MAX_CONSTANTS;
use crate::cpu::Cpu;
use crate::error::{VmError, VmResult};
use crate::ram::Ram;

/// The storage kind a `.name value` definition resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    /// A NUL-terminated string, one byte per character.
    String,
    /// An integer literal within `[-128, 127]`.
    Int8,
    /// Any other (in-range) integer literal.
    Int32,
    /// A literal containing a `.`.
    Float32,
}

/// One resolved constant definition.
#[derive(Debug, Clone)]
pub struct Constant {
    /// Name as written, without the leading `.`.
    pub name: String,
    /// Storage kind chosen by the literal's shape.
    pub kind: ConstantKind,
}

enum ParsedValue {
    String(Vec<u8>),
    Int8(i8),
    Int32(i32),
    Float32(f32),
}

fn malformed(line_no: usize, why: &str) -> VmError {
    VmError::Parse {
        line: line_no,
        message: format!("malformed number literal: {why}"),
    }
}

fn classify_int(value: i64, line_no: usize) -> VmResult<ParsedValue> {
    if value < i32::MIN as i64 || value > i32::MAX as i64 {
        return Err(VmError::Parse {
            line: line_no,
            message: format!("integer literal {value} out of int32 range"),
        });
    }
    if (-128..=127).contains(&value) {
        Ok(ParsedValue::Int8(value as i8))
    } else {
        Ok(ParsedValue::Int32(value as i32))
    }
}

fn parse_value(token: &str, line_no: usize) -> VmResult<ParsedValue> {
    if token.is_empty() {
        return Err(VmError::Parse {
            line: line_no,
            message: "empty constant value".to_string(),
        });
    }

    if let Some(rest) = token.strip_prefix('"') {
        if rest.len() < 1 || !rest.ends_with('"') {
            return Err(VmError::Parse {
                line: line_no,
                message: "unterminated string literal".to_string(),
            });
        }
        let content = &rest[..rest.len() - 1];
        return Ok(ParsedValue::String(content.as_bytes().to_vec()));
    }

    if let Some(hex) = token.strip_prefix("0x") {
        let value = i64::from_str_radix(hex, 16)
            .map_err(|_| malformed(line_no, "invalid hex digits"))?;
        return classify_int(value, line_no);
    }
    if let Some(bin) = token.strip_prefix("0b") {
        let value =
            i64::from_str_radix(bin, 2).map_err(|_| malformed(line_no, "invalid binary digits"))?;
        return classify_int(value, line_no);
    }

    let mut dot_count = 0u32;
    let mut dash_count = 0u32;
    for (i, c) in token.chars().enumerate() {
        match c {
            '-' => {
                dash_count += 1;
                if i != 0 || dash_count > 1 {
                    return Err(malformed(line_no, "more than one leading '-'"));
                }
            }
            '.' => {
                dot_count += 1;
                if dot_count > 1 {
                    return Err(malformed(line_no, "more than one '.'"));
                }
            }
            c if c.is_ascii_digit() => {}
            _ => return Err(malformed(line_no, "non-digit character")),
        }
    }

    if dot_count == 1 {
        let value: f32 = token
            .parse()
            .map_err(|_| malformed(line_no, "invalid float literal"))?;
        Ok(ParsedValue::Float32(value))
    } else {
        let value: i64 = token
            .parse()
            .map_err(|_| malformed(line_no, "invalid integer literal"))?;
        classify_int(value, line_no)
    }
}

/// Lays out every `.name value` definition into `ram` starting at address
/// 0, in source order, first-definition-wins on a duplicate name (same
/// resolution as [`super::labels::parse_labels`]). Returns the resolved
/// constants alongside a parallel table of their RAM start addresses, and
/// sets `$h` to the first free byte past the pool.
pub fn parse_constants(
    lines: &[SourceLine],
    ram: &mut Ram,
    cpu: &mut Cpu,
) -> VmResult<(Vec<Constant>, Vec<usize>)> {
    let mut constants = Vec::new();
    let mut addresses = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut cursor = 0usize;

    for line in lines {
        if line.kind != LineKind::ConstantDef {
            continue;
        }
        if constants.len() >= MAX_CONSTANTS {
            return Err(VmError::Parse {
                line: line.line_no,
                message: format!("MAX_CONSTANTS ({MAX_CONSTANTS}) exceeded"),
            });
        }
        let name = line.tokens[0].trim_start_matches('.').to_string();
        if !seen.insert(name.clone()) {
            continue;
        }
        let value_token = line.tokens.get(1).ok_or_else(|| VmError::Parse {
            line: line.line_no,
            message: "empty constant value".to_string(),
        })?;

        let parsed = parse_value(value_token, line.line_no)?;
        let start = cursor;
        match parsed {
            ParsedValue::String(bytes) => {
                ram.store_string(start, &bytes)?;
                cursor += bytes.len() + 1;
                constants.push(Constant {
                    name,
                    kind: ConstantKind::String,
                });
            }
            ParsedValue::Int8(v) => {
                ram.store_int8(start, v)?;
                cursor += 1;
                constants.push(Constant {
                    name,
                    kind: ConstantKind::Int8,
                });
            }
            ParsedValue::Int32(v) => {
                ram.store_int32(start, v)?;
                cursor += 4;
                constants.push(Constant {
                    name,
                    kind: ConstantKind::Int32,
                });
            }
            ParsedValue::Float32(v) => {
                ram.store_float(start, v)?;
                cursor += 4;
                constants.push(Constant {
                    name,
                    kind: ConstantKind::Float32,
                });
            }
        }
        addresses.push(start);
    }

    cpu.reg_mut(register::H).set_address(cursor);
    Ok((constants, addresses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::tokenize;

    fn layout(source: &str) -> (Vec<Constant>, Vec<usize>, Ram, Cpu) {
        let lines = tokenize(source);
        let mut ram = Ram::new(256);
        let mut cpu = Cpu::new(256);
        let (constants, addresses) = parse_constants(&lines, &mut ram, &mut cpu).unwrap();
        (constants, addresses, ram, cpu)
    }

    #[test]
    fn string_constant_is_nul_terminated() {
        let (constants, addresses, ram, _cpu) = layout(r#".text "Test""#);
        assert_eq!(constants[0].kind, ConstantKind::String);
        assert_eq!(ram.read_cstr(addresses[0]).unwrap(), b"Test");
    }

    #[test]
    fn small_integer_is_int8() {
        let (constants, addresses, ram, _cpu) = layout(".z 5");
        assert_eq!(constants[0].kind, ConstantKind::Int8);
        assert_eq!(ram.read_int8(addresses[0]).unwrap(), 5);
    }

    #[test]
    fn large_integer_is_int32() {
        let (constants, addresses, ram, _cpu) = layout(".z 1000");
        assert_eq!(constants[0].kind, ConstantKind::Int32);
        assert_eq!(ram.read_int32(addresses[0]).unwrap(), 1000);
    }

    #[test]
    fn hex_literal_is_parsed() {
        let (constants, addresses, ram, _cpu) = layout(".k 0xFF");
        assert_eq!(constants[0].kind, ConstantKind::Int32);
        assert_eq!(ram.read_int32(addresses[0]).unwrap(), 255);
    }

    #[test]
    fn dotted_literal_is_float() {
        let (constants, addresses, ram, _cpu) = layout(".f 1.5");
        assert_eq!(constants[0].kind, ConstantKind::Float32);
        assert_eq!(ram.read_float(addresses[0]).unwrap(), 1.5);
    }

    #[test]
    fn h_register_set_to_watermark_past_pool() {
        let (_constants, _addresses, _ram, cpu) = layout(".text \"Test\"\n.z 5");
        // "Test" = 4 bytes + NUL = 5, then one int8 byte = 6 total.
        assert_eq!(cpu.reg(register::H).address(), 6);
    }

    #[test]
    fn duplicate_name_keeps_first_definition() {
        let (constants, addresses, ram, _cpu) = layout(".k 1\n.k 2");
        assert_eq!(constants.len(), 1);
        assert_eq!(ram.read_int8(addresses[0]).unwrap(), 1);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let lines = tokenize(r#".text "oops"#);
        let mut ram = Ram::new(64);
        let mut cpu = Cpu::new(64);
        assert!(parse_constants(&lines, &mut ram, &mut cpu).is_err());
    }

    #[test]
    fn malformed_number_is_an_error() {
        let lines = tokenize(".k 1.2.3");
        let mut ram = Ram::new(64);
        let mut cpu = Cpu::new(64);
        assert!(parse_constants(&lines, &mut ram, &mut cpu).is_err());
    }
}

//! Disassembler for the four 80960 instruction formats.
//!
//! The renderer mirrors the decoder but keeps its own mnemonic tables, so
//! an encoding the core would fold onto a neighbouring operation still
//! disassembles under its architectural name (or as `.word` when it has
//! none). Each entry carries an operand-class word: bit 0 src1, bit 1
//! src2, bit 2 src/dst, bit 3 the floating-point register namespace.

use crate::instruction::MODE_FLAGS;
use crate::registers::Specifier;

/// One disassembled instruction: its textual rendering and the number of
/// bytes it occupies (4, or 8 for MEMB-extended encodings).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Disassembly {
    pub text: String,
    pub size: u32,
}

/// Renders the instruction at `ip`. `extension` is the following word,
/// consulted only for MEMB-extended encodings.
pub fn disassemble(ip: u32, word: u32, extension: u32) -> Disassembly {
    match word >> 28 {
        0x8..=0xF => mem(ip, word, extension),
        0x4..=0x7 => reg(word),
        0x2 | 0x3 => cobr(ip, word),
        _ => ctrl(ip, word),
    }
}

fn invalid(word: u32, extension: u32, size: u32) -> Disassembly {
    let text = if size == 8 {
        format!(".word\t{word:#010x}, {extension:#010x}")
    } else {
        format!(".word\t{word:#010x}")
    };
    Disassembly { text, size }
}

/// Small immediates print in decimal, the rest in hex.
fn imm(x: u32) -> String {
    if x < 10 {
        x.to_string()
    } else {
        format!("{x:#x}")
    }
}

const FP_REGS: [&str; 32] = [
    "fp0", "fp1", "fp2", "fp3", "fp4", "fp5", "fp6", "fp7", "fp8", "fp9", "fp10", "fp11", "fp12",
    "fp13", "fp14", "fp15", "0.0", "fp17", "fp18", "fp19", "fp20", "fp21", "1.0", "fp23", "fp24",
    "fp25", "fp26", "fp27", "fp28", "fp29", "fp30", "fp31",
];

/// Renders one operand field: a literal, a plain register, or a special
/// function / floating-point register when the namespace bit is set.
fn arg(literal: bool, special: bool, index: u32, fp: bool) -> String {
    if special {
        if fp {
            FP_REGS[index as usize].to_string()
        } else {
            format!("sf{index}")
        }
    } else if literal {
        index.to_string()
    } else {
        Specifier::from_u5(index as u8).to_string()
    }
}

const BRANCH_IF: [&str; 8] = ["bno", "bg", "be", "bge", "bl", "bne", "ble", "bo"];
const FAULT_IF: [&str; 8] = [
    "faultno", "faultg", "faulte", "faultge", "faultl", "faultne", "faultle", "faulto",
];

fn ctrl(ip: u32, word: u32) -> Disassembly {
    let index = (word >> 24 & 0x1F) as usize;
    let (name, has_target) = match index {
        0x08 => ("b", true),
        0x09 => ("call", true),
        0x0A => ("ret", false),
        0x0B => ("bal", true),
        0x10..=0x17 => (BRANCH_IF[index & 0x7], true),
        0x18..=0x1F => (FAULT_IF[index & 0x7], false),
        _ => return invalid(word, 0, 4),
    };
    // Bit 1 is the branch-prediction hint; bit 0 is reserved.
    if word & 1 != 0 {
        return invalid(word, 0, 4);
    }
    let suffix = if word & 2 != 0 { ".f" } else { "" };
    let mut text = format!("{name}{suffix}");
    if has_target {
        let displacement = ((word << 8) as i32 >> 8) & !3;
        text.push('\t');
        text.push_str(&imm(ip.wrapping_add_signed(displacement)));
    }
    Disassembly { text, size: 4 }
}

const TEST: [&str; 8] = [
    "testno", "testg", "teste", "testge", "testl", "testne", "testle", "testo",
];
const COMPARE_BRANCH: [&str; 16] = [
    "bbc", "cmpobg", "cmpobe", "cmpobge", "cmpobl", "cmpobne", "cmpoble", "bbs", "cmpibno",
    "cmpibg", "cmpibe", "cmpibge", "cmpibl", "cmpibne", "cmpible", "cmpibo",
];

fn cobr(ip: u32, word: u32) -> Disassembly {
    let index = (word >> 24 & 0x1F) as usize;
    let name = match index {
        0x00..=0x07 => TEST[index],
        0x10..=0x1F => COMPARE_BRANCH[index & 0xF],
        _ => return invalid(word, 0, 4),
    };
    let suffix = if word & 2 != 0 { ".f" } else { "" };
    let src1 = word >> 19 & 0x1F;
    let src2 = word >> 14 & 0x1F;
    let m1 = word >> 13 & 1 != 0;
    let s2 = word & 1 != 0;
    let mut text = format!("{name}{suffix}\t");
    if index & 0x10 != 0 {
        let displacement = ((word << 19) as i32 >> 19) & !3;
        text.push_str(&arg(m1, false, src1, false));
        text.push_str(", ");
        text.push_str(&arg(false, s2, src2, false));
        text.push_str(", ");
        text.push_str(&imm(ip.wrapping_add_signed(displacement)));
    } else {
        // The test group names only its destination; bit 13 moves it into
        // the special-function namespace.
        text.push_str(&arg(false, m1, src1, false));
    }
    Disassembly { text, size: 4 }
}

fn mem_entry(index: u32) -> Option<(&'static str, u8)> {
    Some(match index {
        0x00 => ("ldob", 2),
        0x02 => ("stob", 1),
        0x04 => ("bx", 0),
        0x05 => ("balx", 2),
        0x06 => ("callx", 0),
        0x08 => ("ldos", 2),
        0x0A => ("stos", 1),
        0x0C => ("lda", 2),
        0x10 => ("ld", 2),
        0x12 => ("st", 1),
        0x18 => ("ldl", 2),
        0x1A => ("stl", 1),
        0x20 => ("ldt", 2),
        0x22 => ("stt", 1),
        0x2C => ("dcinva", 0),
        0x30 => ("ldq", 2),
        0x32 => ("stq", 1),
        0x40 => ("ldib", 2),
        0x42 => ("stib", 1),
        0x48 => ("ldis", 2),
        0x4A => ("stis", 1),
        _ => return None,
    })
}

fn mem(ip: u32, word: u32, extension: u32) -> Disassembly {
    let index = word >> 24 & 0x7F;
    let mode = (word >> 10 & 0xF) as usize;
    let flags = MODE_FLAGS[mode];
    let size = if flags & 0x8 != 0 { 8 } else { 4 };
    let displacement = if word & 0x1000 != 0 {
        extension
    } else {
        word & 0xFFF
    };

    let (name, args) = match mem_entry(index) {
        Some(entry) if mode != 6 => entry,
        _ => return invalid(word, extension, size),
    };

    let reg = word >> 19 & 0x1F;
    let base = word >> 14 & 0x1F;
    let index_reg = word & 0x1F;
    let s2 = word >> 6 & 1 != 0;
    let s1 = word >> 5 & 1 != 0;
    let scale = 1u32 << (word >> 7 & 0x7);

    let mut text = format!("{name}\t");
    if args & 1 != 0 {
        text.push_str(&arg(false, false, reg, false));
        text.push_str(", ");
    }
    if mode == 5 {
        text.push_str(&imm(ip.wrapping_add(8).wrapping_add(displacement)));
    }
    if flags & 0x4 != 0 {
        text.push_str(&imm(displacement));
    }
    if flags & 0x2 != 0 {
        text.push('(');
        text.push_str(&arg(false, s2, base, false));
        text.push(')');
    }
    if flags & 0x1 != 0 {
        text.push('[');
        text.push_str(&arg(false, s1, index_reg, false));
        if scale != 1 {
            text.push_str(&format!("*{scale}"));
        }
        text.push(']');
    }
    if args & 2 != 0 {
        text.push_str(", ");
        text.push_str(&arg(false, false, reg, false));
    }
    Disassembly { text, size }
}

fn reg_entry(index: u32) -> Option<(&'static str, u8)> {
    Some(match index {
        0x180 => ("notbit", 7),
        0x181 => ("and", 7),
        0x182 => ("andnot", 7),
        0x183 => ("setbit", 7),
        0x184 => ("notand", 7),
        0x186 => ("xor", 7),
        0x187 => ("or", 7),
        0x188 => ("nor", 7),
        0x189 => ("xnor", 7),
        0x18A => ("not", 5),
        0x18B => ("ornot", 7),
        0x18C => ("clrbit", 7),
        0x18D => ("notor", 7),
        0x18E => ("nand", 7),
        0x18F => ("alterbit", 7),
        0x190 => ("addo", 7),
        0x191 => ("addi", 7),
        0x192 => ("subo", 7),
        0x193 => ("subi", 7),
        0x194 => ("cmpob", 3),
        0x195 => ("cmpib", 3),
        0x196 => ("cmpos", 3),
        0x197 => ("cmpis", 3),
        0x198 => ("shro", 7),
        0x19A => ("shrdi", 7),
        0x19B => ("shri", 7),
        0x19C => ("shlo", 7),
        0x19D => ("rotate", 7),
        0x19E => ("shli", 7),
        0x1A0 => ("cmpo", 3),
        0x1A1 => ("cmpi", 3),
        0x1A2 => ("concmpo", 3),
        0x1A3 => ("concmpi", 3),
        0x1A4 => ("cmpinco", 7),
        0x1A5 => ("cmpinci", 7),
        0x1A6 => ("cmpdeco", 7),
        0x1A7 => ("cmpdeci", 7),
        0x1AC => ("scanbyte", 3),
        0x1AD => ("bswap", 5),
        0x1AE => ("chkbit", 3),
        0x1B0 => ("addc", 7),
        0x1B2 => ("subc", 7),
        0x1B4 => ("intdis", 0),
        0x1B5 => ("inten", 0),
        0x1CC => ("mov", 5),
        0x1D8 => ("eshro", 7),
        0x1DC => ("movl", 5),
        0x1EC => ("movt", 5),
        0x1FC => ("movq", 5),
        0x200 => ("synmov", 3),
        0x201 => ("synmovl", 3),
        0x202 => ("synmovq", 3),
        0x203 => ("cmpstr", 7),
        0x204 => ("movqstr", 7),
        0x205 => ("movstr", 7),
        0x210 => ("atmod", 7),
        0x212 => ("atadd", 7),
        0x213 => ("inspacc", 5),
        0x214 => ("ldphy", 5),
        0x215 => ("synld", 5),
        0x217 => ("fill", 7),
        0x230 => ("sdma", 7),
        0x231 => ("udma", 0),
        0x240 => ("spanbit", 5),
        0x241 => ("scanbit", 5),
        0x242 => ("daddc", 7),
        0x243 => ("dsubc", 7),
        0x244 => ("dmovt", 5),
        0x245 => ("modac", 7),
        0x246 => ("condrec", 5),
        0x250 => ("modify", 7),
        0x251 => ("extract", 7),
        0x254 => ("modtc", 7),
        0x255 => ("modpc", 7),
        0x256 => ("receive", 5),
        0x258 => ("intctl", 5),
        0x259 => ("sysctl", 7),
        0x25B => ("icctl", 7),
        0x25C => ("dcctl", 7),
        0x25D => ("halt", 0),
        0x260 => ("calls", 1),
        0x262 => ("send", 7),
        0x263 => ("sendserv", 1),
        0x264 => ("resumprcs", 1),
        0x265 => ("schedprcs", 1),
        0x266 => ("saveprcs", 0),
        0x268 => ("condwait", 1),
        0x269 => ("wait", 1),
        0x26A => ("signal", 1),
        0x26B => ("mark", 0),
        0x26C => ("fmark", 0),
        0x26D => ("flushreg", 0),
        0x26F => ("syncf", 0),
        0x270 => ("emul", 7),
        0x271 => ("ediv", 7),
        0x273 => ("ldtime", 4),
        0x274 => ("cvtir", 13),
        0x275 => ("cvtilr", 13),
        0x276 => ("scalerl", 15),
        0x277 => ("scaler", 15),
        0x280 => ("atanr", 15),
        0x281 => ("logepr", 15),
        0x282 => ("logr", 15),
        0x283 => ("remr", 15),
        0x284 => ("cmpor", 11),
        0x285 => ("cmpr", 11),
        0x288 => ("sqrtr", 13),
        0x289 => ("expr", 13),
        0x28A => ("logbnr", 13),
        0x28B => ("roundr", 13),
        0x28C => ("sinr", 13),
        0x28D => ("cosr", 13),
        0x28E => ("tanr", 13),
        0x28F => ("classr", 9),
        0x290 => ("atanrl", 15),
        0x291 => ("logeprl", 15),
        0x292 => ("logrl", 15),
        0x293 => ("remrl", 15),
        0x294 => ("cmporl", 11),
        0x295 => ("cmprl", 11),
        0x298 => ("sqrtrl", 13),
        0x299 => ("exprl", 13),
        0x29A => ("logbnrl", 13),
        0x29B => ("roundrl", 13),
        0x29C => ("sinrl", 13),
        0x29D => ("cosrl", 13),
        0x29E => ("tanrl", 13),
        0x29F => ("classrl", 9),
        0x2C0 => ("cvtri", 13),
        0x2C1 => ("cvtril", 13),
        0x2C2 => ("cvtzri", 13),
        0x2C3 => ("cvtzril", 13),
        0x2C9 => ("movr", 13),
        0x2D9 => ("movrl", 13),
        0x2E1 => ("movre", 13),
        0x2E2 => ("cpysre", 15),
        0x2E3 => ("cpyrsre", 15),
        0x301 => ("mulo", 7),
        0x308 => ("remo", 7),
        0x30B => ("divo", 7),
        0x341 => ("muli", 7),
        0x348 => ("remi", 7),
        0x349 => ("modi", 7),
        0x34B => ("divi", 7),
        0x380 => ("addono", 7),
        0x381 => ("addino", 7),
        0x382 => ("subono", 7),
        0x383 => ("subino", 7),
        0x384 => ("selno", 7),
        0x38B => ("divr", 15),
        0x38C => ("mulr", 15),
        0x38D => ("subr", 15),
        0x38F => ("addr", 15),
        0x390 => ("addog", 7),
        0x391 => ("addig", 7),
        0x392 => ("subog", 7),
        0x393 => ("subig", 7),
        0x394 => ("selg", 7),
        0x39B => ("divrl", 15),
        0x39C => ("mulrl", 15),
        0x39D => ("subrl", 15),
        0x39F => ("addrl", 15),
        0x3A0 => ("addoe", 7),
        0x3A1 => ("addie", 7),
        0x3A2 => ("suboe", 7),
        0x3A3 => ("subie", 7),
        0x3A4 => ("sele", 7),
        0x3B0 => ("addoge", 7),
        0x3B1 => ("addige", 7),
        0x3B2 => ("suboge", 7),
        0x3B3 => ("subige", 7),
        0x3B4 => ("selge", 7),
        0x3C0 => ("addol", 7),
        0x3C1 => ("addil", 7),
        0x3C2 => ("subol", 7),
        0x3C3 => ("subil", 7),
        0x3C4 => ("sell", 7),
        0x3D0 => ("addone", 7),
        0x3D1 => ("addine", 7),
        0x3D2 => ("subone", 7),
        0x3D3 => ("subine", 7),
        0x3D4 => ("selne", 7),
        0x3E0 => ("addole", 7),
        0x3E1 => ("addile", 7),
        0x3E2 => ("subole", 7),
        0x3E3 => ("subile", 7),
        0x3E4 => ("selle", 7),
        0x3F0 => ("addoo", 7),
        0x3F1 => ("addio", 7),
        0x3F2 => ("suboo", 7),
        0x3F3 => ("subio", 7),
        0x3F4 => ("selo", 7),
        _ => return None,
    })
}

fn reg(word: u32) -> Disassembly {
    let index = (word >> 20 & 0x3F0) | (word >> 7 & 0xF);
    let (name, args) = match reg_entry(index) {
        Some(entry) => entry,
        None => return invalid(word, 0, 4),
    };

    let src1 = word & 0x1F;
    let src2 = word >> 14 & 0x1F;
    let dst = word >> 19 & 0x1F;
    let s1 = word >> 5 & 1 != 0;
    let s2 = word >> 6 & 1 != 0;
    let s3 = word >> 13 & 1 != 0;
    let m1 = word >> 11 & 1 != 0;
    let m2 = word >> 12 & 1 != 0;
    let fp = args & 8 != 0;

    let mut text = name.to_string();
    let mut separator = '\t';
    if args & 1 != 0 {
        text.push(separator);
        text.push_str(&arg(m1, s1, src1, fp));
        separator = ',';
    }
    if args & 2 != 0 {
        text.push(separator);
        if separator == ',' {
            text.push(' ');
        }
        text.push_str(&arg(m2, s2, src2, fp));
        separator = ',';
    }
    if args & 4 != 0 {
        text.push(separator);
        if separator == ',' {
            text.push(' ');
        }
        text.push_str(&arg(false, s3, dst, fp));
    }
    Disassembly { text, size: 4 }
}

#[cfg(test)]
mod tests {
    use super::disassemble;

    // The encoding constructors live with the decoder tests.
    use crate::instruction::encode::*;

    #[test]
    fn test_ctrl() {
        assert_eq!("b\t0x8040", disassemble(0x8000, ctrl(0x08, 0x40), 0).text);
        assert_eq!("call\t0x7000", disassemble(0x8000, ctrl(0x09, -0x1000), 0).text);
        assert_eq!("ret", disassemble(0x8000, ctrl(0x0A, 0), 0).text);
        assert_eq!("bal\t0x8100", disassemble(0x8000, ctrl(0x0B, 0x100), 0).text);
        assert_eq!("bl\t0x8040", disassemble(0x8000, ctrl(0x14, 0x40), 0).text);
        assert_eq!("faultg", disassemble(0x8000, ctrl(0x19, 0), 0).text);
        // The prediction hint renders as a suffix.
        assert_eq!("bl.f\t0x8040", disassemble(0x8000, ctrl(0x14, 0x40) | 2, 0).text);
        // Unnamed rows and the reserved bit fall back to .word.
        assert_eq!(".word\t0x04000040", disassemble(0x8000, ctrl(0x04, 0x40), 0).text);
        assert_eq!(
            ".word\t0x08000041",
            disassemble(0x8000, ctrl(0x08, 0x40) | 1, 0).text
        );
    }

    #[test]
    fn test_cobr() {
        assert_eq!(
            "cmpibl\tr3, r4, 0x8040",
            disassemble(0x8000, cobr(0x3C, 3, false, 4, 0x40), 0).text
        );
        assert_eq!(
            "bbs\t5, r4, 0x7ff0",
            disassemble(0x8000, cobr(0x37, 5, true, 4, -0x10), 0).text
        );
        assert_eq!(
            "testl\tr6",
            disassemble(0x8000, cobr(0x24, 6, false, 0, 0), 0).text
        );
        assert_eq!(
            ".word\t0x28000000",
            disassemble(0x8000, cobr(0x28, 0, false, 0, 0), 0).text
        );
    }

    #[test]
    fn test_reg() {
        assert_eq!(
            "addi\tg0, g1, g2",
            disassemble(0, reg(0x591, 16, false, 17, false, 18), 0).text
        );
        assert_eq!(
            "subo\t1, r4, r4",
            disassemble(0, reg(0x592, 1, true, 4, false, 4), 0).text
        );
        assert_eq!(
            "not\tr3, r4",
            disassemble(0, reg(0x58A, 3, false, 0, false, 4), 0).text
        );
        assert_eq!("intdis", disassemble(0, reg(0x5B4, 0, false, 0, false, 0), 0).text);
        assert_eq!(
            "calls\t7",
            disassemble(0, reg(0x660, 7, true, 0, false, 0), 0).text
        );
        assert_eq!(
            "atmod\tr3, r4, r5",
            disassemble(0, reg(0x610, 3, false, 4, false, 5), 0).text
        );
        assert_eq!(
            "sell\tpfp, sp, fp",
            disassemble(0, reg(0x7C4, 0, false, 1, false, 31), 0).text
        );
        // An unlisted row renders as data.
        assert_eq!(
            ".word\t0x40000000",
            disassemble(0, reg(0x400, 0, false, 0, false, 0), 0).text
        );
    }

    #[test]
    fn test_reg_fp_namespace() {
        // addr with the special-namespace bits picks floating-point
        // register names, including the 0.0 and 1.0 literals.
        let word = reg(0x78F, 16, false, 22, false, 2) | 1 << 5 | 1 << 6 | 1 << 13;
        assert_eq!("addr\t0.0, 1.0, fp2", disassemble(0, word, 0).text);
    }

    #[test]
    fn test_mem() {
        assert_eq!(
            "ld\t0x20(r3), r4",
            disassemble(0, mema(0x90, 4, Some(3), 0x20), 0).text
        );
        assert_eq!(
            "st\tr4, 0x24(r3)",
            disassemble(0, mema(0x92, 4, Some(3), 0x24), 0).text
        );
        assert_eq!(
            "ldob\t0x123, r4",
            disassemble(0, mema(0x80, 4, None, 0x123), 0).text
        );
        assert_eq!(
            "ldq\t(g2)[g3*4], r4",
            disassemble(0, memb(0xB0, 4, 0x7, 18, 19, 2), 0).text
        );
        assert_eq!(
            "bx\t(r3)",
            disassemble(0, memb(0x84, 0, 0x4, 3, 0, 0), 0).text
        );
        let lda = disassemble(0, memb(0x8C, 4, 0xC, 0, 0, 0), 0xDEAD_BEEF);
        assert_eq!("lda\t0xdeadbeef, r4", lda.text);
        assert_eq!(8, lda.size);
        // An unscaled index prints without the multiplier.
        assert_eq!(
            "ld\t(r3)[r5], r4",
            disassemble(0, memb(0x90, 4, 0x7, 3, 5, 0), 0).text
        );
        // IP-relative addressing renders the resolved target.
        assert_eq!(
            "ld\t0x8108, r4",
            disassemble(0x8000, memb(0x90, 4, 0x5, 0, 0, 0), 0x100).text
        );
    }

    #[test]
    fn test_mem_invalid() {
        // The reserved addressing mode renders as data at its real size.
        let invalid = disassemble(0, memb(0x90, 0, 0x6, 0, 0, 0), 0);
        assert_eq!(".word\t0x90001800", invalid.text);
        assert_eq!(4, invalid.size);
        // An unknown opcode byte in a long encoding keeps both words.
        let invalid = disassemble(0, memb(0xFE, 0, 0xC, 0, 0, 0), 0x1234_5678);
        assert_eq!(".word\t0xfe003000, 0x12345678", invalid.text);
        assert_eq!(8, invalid.size);
    }
}

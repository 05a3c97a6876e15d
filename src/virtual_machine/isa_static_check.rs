//! Pins the instruction table. Opcode tags are the on-disk program format, so
//! any edit to names, tags, mnemonics or operand kinds must update the hash.

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const EXPECTED_ISA_HASH: u64 = 0x2e0b79932f601e0b;

fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
    for b in bytes {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

macro_rules! hash_isa {
    (
        $( $(#[$doc:meta])* $name:ident = $tag:literal, $mnemonic:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
    ) => {{
        let mut h = FNV_OFFSET;
        $(
            h = fnv1a64(h, stringify!($name).as_bytes());
            h = fnv1a64(h, &(crate::virtual_machine::isa::Opcode::$name as u32).to_le_bytes());
            h = fnv1a64(h, $mnemonic.as_bytes());
            $( h = fnv1a64(h, stringify!($kind).as_bytes()); )*
        )*
        h
    }};
}

fn current_isa_hash() -> u64 {
    crate::for_each_instruction!(hash_isa)
}

#[test]
#[ignore]
fn print_isa_hash() {
    println!("ISA_HASH=0x{:016x}", current_isa_hash());
}

#[test]
fn isa_hash_unchanged() {
    assert_eq!(current_isa_hash(), EXPECTED_ISA_HASH);
}

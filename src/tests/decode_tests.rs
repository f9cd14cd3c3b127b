#[cfg(test)]
mod tests {
    use crate::dex::error::ErrorKind;
    use crate::dex::instructions::{Instruction, Operand};

    #[test]
    fn literal_formats() {
        // const/16 v1, #-5
        let i = Instruction::decode(&[0x0113, 0xfffb], 0).unwrap();
        assert_eq!(i.info().mnemonic, "const/16");
        assert_eq!(i.registers, vec![1]);
        assert_eq!(i.operand, Operand::Lit(-5));
        assert_eq!(i.size(), 2);

        // const/4 v0, #-1 packs the literal in the top nibble
        let i = Instruction::decode(&[0xf012], 0).unwrap();
        assert_eq!(i.registers, vec![0]);
        assert_eq!(i.operand, Operand::Lit(-1));

        // const/high16 shifts its unit into the top half
        let i = Instruction::decode(&[0x0015, 0x7f80], 0).unwrap();
        assert_eq!(i.operand, Operand::Lit(0x7f80_0000));

        // const-wide/high16 shifts into bits 48..64
        let i = Instruction::decode(&[0x0019, 0x4000], 0).unwrap();
        assert_eq!(i.operand, Operand::Lit(0x4000_0000_0000_0000));

        // const-wide carries a full 64 bit little-endian literal
        let i = Instruction::decode(&[0x0018, 0xcdef, 0x89ab, 0x4567, 0x0123], 0).unwrap();
        assert_eq!(i.operand, Operand::Lit(0x0123_4567_89ab_cdef));
        assert_eq!(i.size(), 5);
    }

    #[test]
    fn register_formats() {
        // add-int v0, v2, v3
        let i = Instruction::decode(&[0x0090, 0x0302], 0).unwrap();
        assert_eq!(i.registers, vec![0, 2, 3]);

        // add-int/lit8 v0, v1, #-2
        let i = Instruction::decode(&[0x00d8, 0xfe01], 0).unwrap();
        assert_eq!(i.registers, vec![0, 1]);
        assert_eq!(i.operand, Operand::Lit(-2));

        // move/from16 v2, v257
        let i = Instruction::decode(&[0x0202, 0x0101], 0).unwrap();
        assert_eq!(i.registers, vec![2, 257]);
    }

    #[test]
    fn invoke_register_nibbles() {
        // invoke-static {v1, v3}, method@7
        let i = Instruction::decode(&[0x2071, 0x0007, 0x0031], 0).unwrap();
        assert_eq!(i.registers, vec![1, 3]);
        assert_eq!(i.operand, Operand::Method(7));

        // the fifth register rides in the first word
        let i = Instruction::decode(&[0x5571, 0x0007, 0x4321], 0).unwrap();
        assert_eq!(i.registers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn invoke_register_count_overflow() {
        // a count nibble above five is not encodable
        let e = Instruction::decode(&[0x6071, 0x0007, 0x4321], 0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decode);
    }

    #[test]
    fn invoke_range_registers() {
        // invoke-static/range {v4 .. v6}, method@2
        let i = Instruction::decode(&[0x0377, 0x0002, 0x0004], 0).unwrap();
        assert_eq!(i.registers, vec![4, 5, 6]);
        assert_eq!(i.operand, Operand::Method(2));
    }

    #[test]
    fn branch_targets_are_absolute() {
        // if-eqz v0, +5 decoded at pc 2 lands on pc 7
        let i = Instruction::decode(&[0x0000, 0x0000, 0x0038, 0x0005], 2).unwrap();
        assert_eq!(i.target(), 7);

        // goto -2 at pc 4 lands on pc 2
        let i = Instruction::decode(&[0x0000, 0x0000, 0x0000, 0x0000, 0xfe28], 4).unwrap();
        assert_eq!(i.target(), 2);
    }

    #[test]
    fn truncated_instruction() {
        let e = Instruction::decode(&[0x0013], 0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decode);

        let e = Instruction::decode(&[0x0000], 1).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decode);
    }

    #[test]
    fn undefined_opcode() {
        let e = Instruction::decode(&[0x003e], 0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decode);
        let e = Instruction::decode(&[0x00ff], 0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decode);
    }

    #[test]
    fn packed_switch_table() {
        // packed-switch v1 over keys 10..=11, table right after the insn
        let code = [
            0x012b, 0x0003, 0x0000, // packed-switch v1, +3
            0x0100, 0x0002, // ident, size
            0x000a, 0x0000, // first key 10
            0x0008, 0x0000, // +8
            0x000a, 0x0000, // +10
        ];
        let i = Instruction::decode(&code, 0).unwrap();
        assert_eq!(i.registers, vec![1]);
        assert_eq!(i.switch_targets(), vec![8, 10]);
        assert_eq!(i.switch_keys(), vec![10, 11]);
        assert_eq!(i.min_switch_key(), 10);
        assert_eq!(i.max_switch_key(), 11);

        // the table itself decodes to a non-executable placeholder
        let t = Instruction::decode(&code, 3).unwrap();
        assert!(!t.is_instruction());
        assert_eq!(t.size(), 8);
    }

    #[test]
    fn sparse_switch_table() {
        let code = [
            0x012c, 0x0003, 0x0000, // sparse-switch v1, +3
            0x0200, 0x0002, // ident, size
            0xffff, 0xffff, // key -1
            0x000a, 0x0000, // key 10
            0x0005, 0x0000, // +5
            0x0007, 0x0000, // +7
        ];
        let i = Instruction::decode(&code, 0).unwrap();
        assert_eq!(i.switch_keys(), vec![-1, 10]);
        assert_eq!(i.switch_targets(), vec![5, 7]);
        assert_eq!(i.min_switch_key(), -1);
        // last key of the sorted table, not first + size
        assert_eq!(i.max_switch_key(), 10);
    }

    #[test]
    fn mismatched_table_kind() {
        // packed-switch referencing a sparse-switch table
        let code = [0x012b, 0x0003, 0x0000, 0x0200, 0x0000];
        let e = Instruction::decode(&code, 0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decode);
    }

    #[test]
    fn fill_array_data_elements() {
        let code = [
            0x0026, 0x0003, 0x0000, // fill-array-data v0, +3
            0x0300, 0x0001, // ident, width 1
            0x0002, 0x0000, // count 2
            0x80ff, // bytes -1, -128
        ];
        let i = Instruction::decode(&code, 0).unwrap();
        assert_eq!(i.num_fill_elements(), 2);
        assert_eq!(i.fill_element_width(), 1);
        assert_eq!(i.fill_element_bits(0), -1);
        assert_eq!(i.fill_element_bits(1), -128);
    }

    #[test]
    fn table_overruns_code() {
        // count claims more data than the method holds
        let code = [0x0026, 0x0003, 0x0000, 0x0300, 0x0002, 0x00ff, 0x0000];
        let e = Instruction::decode(&code, 0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decode);
    }
}

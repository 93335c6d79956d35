//! The generic BEAM instruction set.
//!
//! Ids and operand counts follow `genop.tab` of Erlang/OTP. An instruction's
//! arity is the number of compact terms that follow its opcode byte, not a
//! number of bytes: an extended list counts as one operand.

/// An instruction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Opcode {
    pub id: u8,
    pub name: &'static str,
    pub arity: usize,
}
impl Opcode {
    const fn new(id: u8, name: &'static str, arity: usize) -> Self {
        Opcode { id, name, arity }
    }

    /// The stand-in for an id missing from the table.
    ///
    /// It has no operands, so the bytes after it are decoded as the next
    /// instruction whether or not they really are one.
    pub const fn unknown(id: u8) -> Self {
        Opcode::new(id, "unknown", 0)
    }

    pub fn is_unknown(&self) -> bool {
        lookup(self.id).is_none()
    }
}

/// The highest opcode id this table knows.
pub const MAX_OPCODE: u8 = 184;

/// Opcode `n` is stored at index `n - 1`.
pub static OPCODES: [Opcode; MAX_OPCODE as usize] = [
    Opcode::new(1, "label", 1),
    Opcode::new(2, "func_info", 3),
    Opcode::new(3, "int_code_end", 0),
    Opcode::new(4, "call", 2),
    Opcode::new(5, "call_last", 3),
    Opcode::new(6, "call_only", 2),
    Opcode::new(7, "call_ext", 2),
    Opcode::new(8, "call_ext_last", 3),
    Opcode::new(9, "bif0", 2),
    Opcode::new(10, "bif1", 4),
    Opcode::new(11, "bif2", 5),
    Opcode::new(12, "allocate", 2),
    Opcode::new(13, "allocate_heap", 3),
    Opcode::new(14, "allocate_zero", 2),
    Opcode::new(15, "allocate_heap_zero", 3),
    Opcode::new(16, "test_heap", 2),
    Opcode::new(17, "init", 1),
    Opcode::new(18, "deallocate", 1),
    Opcode::new(19, "return", 0),
    Opcode::new(20, "send", 0),
    Opcode::new(21, "remove_message", 0),
    Opcode::new(22, "timeout", 0),
    Opcode::new(23, "loop_rec", 2),
    Opcode::new(24, "loop_rec_end", 1),
    Opcode::new(25, "wait", 1),
    Opcode::new(26, "wait_timeout", 2),
    Opcode::new(27, "m_plus", 4),
    Opcode::new(28, "m_minus", 4),
    Opcode::new(29, "m_times", 4),
    Opcode::new(30, "m_div", 4),
    Opcode::new(31, "int_div", 4),
    Opcode::new(32, "int_rem", 4),
    Opcode::new(33, "int_band", 4),
    Opcode::new(34, "int_bor", 4),
    Opcode::new(35, "int_bxor", 4),
    Opcode::new(36, "int_bsl", 4),
    Opcode::new(37, "int_bsr", 4),
    Opcode::new(38, "int_bnot", 3),
    Opcode::new(39, "is_lt", 3),
    Opcode::new(40, "is_ge", 3),
    Opcode::new(41, "is_eq", 3),
    Opcode::new(42, "is_ne", 3),
    Opcode::new(43, "is_eq_exact", 3),
    Opcode::new(44, "is_ne_exact", 3),
    Opcode::new(45, "is_integer", 2),
    Opcode::new(46, "is_float", 2),
    Opcode::new(47, "is_number", 2),
    Opcode::new(48, "is_atom", 2),
    Opcode::new(49, "is_pid", 2),
    Opcode::new(50, "is_reference", 2),
    Opcode::new(51, "is_port", 2),
    Opcode::new(52, "is_nil", 2),
    Opcode::new(53, "is_binary", 2),
    Opcode::new(54, "is_constant", 2),
    Opcode::new(55, "is_list", 2),
    Opcode::new(56, "is_nonempty_list", 2),
    Opcode::new(57, "is_tuple", 2),
    Opcode::new(58, "test_arity", 3),
    Opcode::new(59, "select_val", 3),
    Opcode::new(60, "select_tuple_arity", 3),
    Opcode::new(61, "jump", 1),
    Opcode::new(62, "catch", 2),
    Opcode::new(63, "catch_end", 1),
    Opcode::new(64, "move", 2),
    Opcode::new(65, "get_list", 3),
    Opcode::new(66, "get_tuple_element", 3),
    Opcode::new(67, "set_tuple_element", 3),
    Opcode::new(68, "put_string", 3),
    Opcode::new(69, "put_list", 3),
    Opcode::new(70, "put_tuple", 2),
    Opcode::new(71, "put", 1),
    Opcode::new(72, "badmatch", 1),
    Opcode::new(73, "if_end", 0),
    Opcode::new(74, "case_end", 1),
    Opcode::new(75, "call_fun", 1),
    Opcode::new(76, "make_fun", 3),
    Opcode::new(77, "is_function", 2),
    Opcode::new(78, "call_ext_only", 2),
    Opcode::new(79, "bs_start_match", 2),
    Opcode::new(80, "bs_get_integer", 5),
    Opcode::new(81, "bs_get_float", 5),
    Opcode::new(82, "bs_get_binary", 5),
    Opcode::new(83, "bs_skip_bits", 4),
    Opcode::new(84, "bs_test_tail", 2),
    Opcode::new(85, "bs_save", 1),
    Opcode::new(86, "bs_restore", 1),
    Opcode::new(87, "bs_init", 2),
    Opcode::new(88, "bs_final", 2),
    Opcode::new(89, "bs_put_integer", 5),
    Opcode::new(90, "bs_put_binary", 5),
    Opcode::new(91, "bs_put_float", 5),
    Opcode::new(92, "bs_put_string", 2),
    Opcode::new(93, "bs_need_buf", 1),
    Opcode::new(94, "fclearerror", 0),
    Opcode::new(95, "fcheckerror", 1),
    Opcode::new(96, "fmove", 2),
    Opcode::new(97, "fconv", 2),
    Opcode::new(98, "fadd", 4),
    Opcode::new(99, "fsub", 4),
    Opcode::new(100, "fmul", 4),
    Opcode::new(101, "fdiv", 4),
    Opcode::new(102, "fnegate", 3),
    Opcode::new(103, "make_fun2", 1),
    Opcode::new(104, "try", 2),
    Opcode::new(105, "try_end", 1),
    Opcode::new(106, "try_case", 1),
    Opcode::new(107, "try_case_end", 1),
    Opcode::new(108, "raise", 2),
    Opcode::new(109, "bs_init2", 6),
    Opcode::new(110, "bs_bits_to_bytes", 3),
    Opcode::new(111, "bs_add", 5),
    Opcode::new(112, "apply", 1),
    Opcode::new(113, "apply_last", 2),
    Opcode::new(114, "is_boolean", 2),
    Opcode::new(115, "is_function2", 3),
    Opcode::new(116, "bs_start_match2", 5),
    Opcode::new(117, "bs_get_integer2", 7),
    Opcode::new(118, "bs_get_float2", 7),
    Opcode::new(119, "bs_get_binary2", 7),
    Opcode::new(120, "bs_skip_bits2", 5),
    Opcode::new(121, "bs_test_tail2", 3),
    Opcode::new(122, "bs_save2", 2),
    Opcode::new(123, "bs_restore2", 2),
    Opcode::new(124, "gc_bif1", 5),
    Opcode::new(125, "gc_bif2", 6),
    Opcode::new(126, "bs_final2", 2),
    Opcode::new(127, "bs_bits_to_bytes2", 2),
    Opcode::new(128, "put_literal", 2),
    Opcode::new(129, "is_bitstr", 2),
    Opcode::new(130, "bs_context_to_binary", 1),
    Opcode::new(131, "bs_test_unit", 3),
    Opcode::new(132, "bs_match_string", 4),
    Opcode::new(133, "bs_init_writable", 0),
    Opcode::new(134, "bs_append", 8),
    Opcode::new(135, "bs_private_append", 6),
    Opcode::new(136, "trim", 2),
    Opcode::new(137, "bs_init_bits", 6),
    Opcode::new(138, "bs_get_utf8", 5),
    Opcode::new(139, "bs_skip_utf8", 4),
    Opcode::new(140, "bs_get_utf16", 5),
    Opcode::new(141, "bs_skip_utf16", 4),
    Opcode::new(142, "bs_get_utf32", 5),
    Opcode::new(143, "bs_skip_utf32", 4),
    Opcode::new(144, "bs_utf8_size", 3),
    Opcode::new(145, "bs_put_utf8", 3),
    Opcode::new(146, "bs_utf16_size", 3),
    Opcode::new(147, "bs_put_utf16", 3),
    Opcode::new(148, "bs_put_utf32", 3),
    Opcode::new(149, "on_load", 0),
    Opcode::new(150, "recv_mark", 1),
    Opcode::new(151, "recv_set", 1),
    Opcode::new(152, "gc_bif3", 7),
    Opcode::new(153, "line", 1),
    Opcode::new(154, "put_map_assoc", 5),
    Opcode::new(155, "put_map_exact", 5),
    Opcode::new(156, "is_map", 2),
    Opcode::new(157, "has_map_fields", 3),
    Opcode::new(158, "get_map_elements", 3),
    Opcode::new(159, "is_tagged_tuple", 4),
    Opcode::new(160, "build_stacktrace", 0),
    Opcode::new(161, "raw_raise", 0),
    Opcode::new(162, "get_hd", 2),
    Opcode::new(163, "get_tl", 2),
    Opcode::new(164, "put_tuple2", 2),
    Opcode::new(165, "bs_get_tail", 3),
    Opcode::new(166, "bs_start_match3", 4),
    Opcode::new(167, "bs_get_position", 3),
    Opcode::new(168, "bs_set_position", 2),
    Opcode::new(169, "swap", 2),
    Opcode::new(170, "bs_start_match4", 4),
    Opcode::new(171, "make_fun3", 3),
    Opcode::new(172, "init_yregs", 1),
    Opcode::new(173, "recv_marker_bind", 2),
    Opcode::new(174, "recv_marker_clear", 1),
    Opcode::new(175, "recv_marker_reserve", 1),
    Opcode::new(176, "recv_marker_use", 1),
    Opcode::new(177, "bs_create_bin", 6),
    Opcode::new(178, "call_fun2", 3),
    Opcode::new(179, "nif_start", 0),
    Opcode::new(180, "badrecord", 1),
    Opcode::new(181, "update_record", 5),
    Opcode::new(182, "bs_match", 3),
    Opcode::new(183, "executable_line", 2),
    Opcode::new(184, "debug_line", 4),
];

/// Returns the opcode with the given id, if the table has it.
pub fn lookup(id: u8) -> Option<&'static Opcode> {
    let index = usize::from(id.checked_sub(1)?);
    OPCODES.get(index)
}

/// Returns the opcode with the given id, or [`Opcode::unknown`].
pub fn find(id: u8) -> Opcode {
    lookup(id).copied().unwrap_or(Opcode::unknown(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_id() {
        for (i, op) in OPCODES.iter().enumerate() {
            assert_eq!(i + 1, usize::from(op.id), "{}", op.name);
        }
    }

    #[test]
    fn well_known_opcodes() {
        assert_eq!(Opcode::new(1, "label", 1), find(1));
        assert_eq!(Opcode::new(2, "func_info", 3), find(2));
        assert_eq!(Opcode::new(19, "return", 0), find(19));
        assert_eq!(Opcode::new(59, "select_val", 3), find(59));
        assert_eq!(Opcode::new(64, "move", 2), find(64));
        assert_eq!(Opcode::new(153, "line", 1), find(153));
        assert_eq!(Opcode::new(177, "bs_create_bin", 6), find(177));
    }

    #[test]
    fn unknown_ids() {
        assert_eq!(None, lookup(0));
        assert_eq!(None, lookup(MAX_OPCODE + 1));
        assert_eq!(None, lookup(u8::MAX));

        let op = find(250);
        assert_eq!((250, "unknown", 0), (op.id, op.name, op.arity));
        assert!(op.is_unknown());
        assert!(!find(3).is_unknown());
    }
}

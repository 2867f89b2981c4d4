//! Loads and stores: displacement, post-increment, stack and register-indirect forms.
//!
//! In every form the destination field names the address register and the
//! source field the data register.

use tracing::warn;

use super::Operand;
use crate::cpu::Cpu;
use crate::encoding::Operation;
use crate::fault::GuestException;
use crate::memory::{io_address, Bus};
use crate::timing::CycleCostKind;

/// Access width and space selected by a displacement's sub-type and low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataForm {
    ByteSigned,
    ByteUnsigned,
    HalfSigned,
    HalfUnsigned,
    Word,
    Double,
    IoWord,
    IoDouble,
    /// `LDW.S`/`STW.S`: locals above `SP` live in the register bank.
    Stack,
    Reserved,
}

impl DataForm {
    /// Splits a decoded displacement into its form and the byte offset it
    /// actually contributes (selector bits cleared).
    const fn classify(sub_type: u8, value: u32, post_increment: bool) -> (Self, u32) {
        match sub_type {
            0 => (Self::ByteSigned, value),
            1 => (Self::ByteUnsigned, value),
            2 if value & 1 != 0 => (Self::HalfSigned, value & !1),
            2 => (Self::HalfUnsigned, value),
            _ => match value & 3 {
                0 => (Self::Word, value),
                1 => (Self::Double, value & !1),
                2 if post_increment => (Self::Reserved, value & !3),
                2 => (Self::IoWord, value & !3),
                _ if post_increment => (Self::Stack, value & !3),
                _ => (Self::IoDouble, value & !3),
            },
        }
    }

    const fn cost(self) -> CycleCostKind {
        match self {
            Self::Double | Self::IoDouble => CycleCostKind::MemoryDouble,
            Self::Stack => CycleCostKind::MemoryStack,
            _ => CycleCostKind::MemoryWord,
        }
    }
}

fn read_word(bus: &mut dyn Bus, addr: u32) -> u32 {
    bus.read_word(addr & !3)
}

fn write_word(bus: &mut dyn Bus, addr: u32, value: u32) {
    bus.write_word(addr & !3, value);
}

const fn fits_signed(value: u32, sign_mask: u32) -> bool {
    let high = value & sign_mask;
    high == 0 || high == sign_mask
}

impl Cpu {
    /// Data register value for a store: an `SR` source stores zero.
    fn store_source(&mut self, data: Operand) -> (u32, u32) {
        if data.is_sr() {
            (0, 0)
        } else {
            (self.read(data), self.read(data.next()))
        }
    }

    fn load_form(&mut self, form: DataForm, addr: u32, data: Operand, bus: &mut dyn Bus) {
        match form {
            DataForm::ByteSigned => {
                let value = bus.read_byte(addr) as i8;
                self.write(data, i32::from(value) as u32);
            }
            DataForm::ByteUnsigned => {
                let value = bus.read_byte(addr);
                self.write(data, u32::from(value));
            }
            DataForm::HalfSigned => {
                let value = bus.read_half(addr & !1) as i16;
                self.write(data, i32::from(value) as u32);
            }
            DataForm::HalfUnsigned => {
                let value = bus.read_half(addr & !1);
                self.write(data, u32::from(value));
            }
            DataForm::Word => {
                let value = read_word(bus, addr);
                self.write(data, value);
            }
            DataForm::Double => {
                let high = read_word(bus, addr);
                let low = read_word(bus, addr.wrapping_add(4));
                self.write(data, high);
                self.write(data.next(), low);
            }
            DataForm::IoWord => {
                let value = bus.io_read_word(io_address(addr));
                self.write(data, value);
            }
            DataForm::IoDouble => {
                let high = bus.io_read_word(io_address(addr));
                let low = bus.io_read_word(io_address(addr.wrapping_add(4)));
                self.write(data, high);
                self.write(data.next(), low);
            }
            DataForm::Stack => {
                let value = if addr < self.regs.sp() {
                    read_word(bus, addr)
                } else {
                    self.regs.local_abs(((addr & 0xfc) >> 2) as usize)
                };
                self.write(data, value);
            }
            DataForm::Reserved => {
                warn!(
                    op = format_args!("{:#06x}", self.op),
                    "reserved load sub-type"
                );
            }
        }
    }

    fn store_form(&mut self, form: DataForm, addr: u32, data: Operand, bus: &mut dyn Bus) {
        let (value, value_f) = self.store_source(data);
        let mut out_of_range = false;
        match form {
            DataForm::ByteSigned | DataForm::ByteUnsigned => {
                bus.write_byte(addr, value as u8);
                out_of_range = form == DataForm::ByteSigned && !fits_signed(value, 0xffff_ff80);
            }
            DataForm::HalfSigned | DataForm::HalfUnsigned => {
                bus.write_half(addr & !1, value as u16);
                out_of_range = form == DataForm::HalfSigned && !fits_signed(value, 0xffff_8000);
            }
            DataForm::Word => write_word(bus, addr, value),
            DataForm::Double => {
                write_word(bus, addr, value);
                write_word(bus, addr.wrapping_add(4), value_f);
            }
            DataForm::IoWord => bus.io_write_word(io_address(addr), value),
            DataForm::IoDouble => {
                bus.io_write_word(io_address(addr), value);
                bus.io_write_word(io_address(addr.wrapping_add(4)), value_f);
            }
            DataForm::Stack => {
                if addr < self.regs.sp() {
                    write_word(bus, addr, value);
                } else {
                    self.regs.set_local_abs(((addr & 0xfc) >> 2) as usize, value);
                }
            }
            DataForm::Reserved => {
                warn!(
                    op = format_args!("{:#06x}", self.op),
                    "reserved store sub-type"
                );
            }
        }
        if out_of_range {
            self.raise(GuestException::Range);
        }
    }

    /// Base address of a displacement form; an `SR` address register means absolute.
    fn displacement_base(&mut self, address: Operand) -> u32 {
        if address.is_sr() {
            0
        } else {
            self.read(address)
        }
    }

    fn decode_data_form(&mut self, bus: &mut dyn Bus, post_increment: bool) -> (DataForm, u32) {
        let mut cursor = self.cursor();
        let displacement = cursor.decode_displacement(bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();
        DataForm::classify(displacement.sub_type, displacement.value, post_increment)
    }

    /// `LDxx.D`/`LDxx.A`/`LDxx.IOD`.
    pub(super) fn op_load_displacement(
        &mut self,
        address: Operand,
        data: Operand,
        bus: &mut dyn Bus,
    ) {
        let (form, offset) = self.decode_data_form(bus, false);
        let addr = self.displacement_base(address).wrapping_add(offset);
        self.load_form(form, addr, data, bus);
        self.charge(form.cost());
    }

    /// `STxx.D`/`STxx.A`/`STxx.IOD`.
    pub(super) fn op_store_displacement(
        &mut self,
        address: Operand,
        data: Operand,
        bus: &mut dyn Bus,
    ) {
        let (form, offset) = self.decode_data_form(bus, false);
        let addr = self.displacement_base(address).wrapping_add(offset);
        self.charge(form.cost());
        self.store_form(form, addr, data, bus);
    }

    fn post_increment_valid(&self, address: Operand) -> bool {
        if address.is_pc() || address.is_sr() {
            warn!(
                op = format_args!("{:#06x}", self.op),
                "post-increment through PC or SR is undefined"
            );
            return false;
        }
        true
    }

    /// `LDxx.N` and `LDW.S`: access at `Rd`, then advance `Rd`.
    pub(super) fn op_load_next(&mut self, address: Operand, data: Operand, bus: &mut dyn Bus) {
        let (form, step) = self.decode_data_form(bus, true);
        if self.post_increment_valid(address) {
            let addr = self.read(address);
            self.write(address, addr.wrapping_add(step));
            self.load_form(form, addr, data, bus);
        }
        self.charge(form.cost());
    }

    /// `STxx.N` and `STW.S`: access at `Rd`, then advance `Rd`.
    pub(super) fn op_store_next(&mut self, address: Operand, data: Operand, bus: &mut dyn Bus) {
        let (form, step) = self.decode_data_form(bus, true);
        self.charge(form.cost());
        if self.post_increment_valid(address) {
            let addr = self.read(address);
            self.store_form(form, addr, data, bus);
            self.write(address, addr.wrapping_add(step));
        }
    }

    /// `LDW.R`..`STD.P`: register-indirect word and double accesses,
    /// the `.P` forms post-incrementing the local address register.
    pub(super) fn op_register_memory(
        &mut self,
        operation: Operation,
        address: Operand,
        data: Operand,
        bus: &mut dyn Bus,
    ) {
        self.check_delay_pc();
        let addr = self.read(address);
        let (form, step, load) = match operation {
            Operation::LdwR => (DataForm::Word, 0, true),
            Operation::LddR => (DataForm::Double, 0, true),
            Operation::LdwP => (DataForm::Word, 4, true),
            Operation::LddP => (DataForm::Double, 8, true),
            Operation::StwR => (DataForm::Word, 0, false),
            Operation::StdR => (DataForm::Double, 0, false),
            Operation::StwP => (DataForm::Word, 4, false),
            _ => (DataForm::Double, 8, false),
        };

        if load {
            if step != 0 {
                self.write(address, addr.wrapping_add(step));
            }
            self.load_form(form, addr, data, bus);
        } else {
            self.store_form(form, addr, data, bus);
            if step != 0 {
                self.write(address, addr.wrapping_add(step));
            }
        }
        self.charge(form.cost());
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::DataForm;
    use crate::cpu::Cpu;
    use crate::encoding::Operation;
    use crate::execute::Operand;
    use crate::memory::{Bus, FlatMemory};
    use crate::state::{SP_REGISTER, TPR_REGISTER};

    fn booted() -> Cpu {
        let mut cpu = Cpu::default();
        cpu.reset();
        cpu.set_global(TPR_REGISTER, 0);
        cpu.regs.set_pc(0x1002);
        cpu.icount = 100;
        cpu.slice_budget = 100;
        cpu
    }

    #[rstest]
    #[case(0, 0x11, DataForm::ByteSigned, 0x11)]
    #[case(2, 0x11, DataForm::HalfSigned, 0x10)]
    #[case(2, 0x10, DataForm::HalfUnsigned, 0x10)]
    #[case(3, 0x21, DataForm::Double, 0x20)]
    #[case(3, 0x22, DataForm::IoWord, 0x20)]
    #[case(3, 0x23, DataForm::IoDouble, 0x20)]
    fn displacement_selector_bits(
        #[case] sub_type: u8,
        #[case] value: u32,
        #[case] form: DataForm,
        #[case] offset: u32,
    ) {
        assert_eq!(DataForm::classify(sub_type, value, false), (form, offset));
    }

    #[test]
    fn post_increment_repurposes_io_selectors() {
        assert_eq!(DataForm::classify(3, 0x07, true), (DataForm::Stack, 4));
        assert_eq!(DataForm::classify(3, 0x06, true).0, DataForm::Reserved);
    }

    #[test]
    fn load_byte_signed_with_displacement() {
        let mut bus = FlatMemory::new();
        bus.load_halfwords(0x1002, &[0x0004]);
        bus.write_byte(0x2004, 0x80);
        let mut cpu = booted();
        cpu.regs.set_local(0, 0x2000);
        cpu.op_load_displacement(Operand::local(0), Operand::local(1), &mut bus);
        assert_eq!(cpu.local(1), 0xffff_ff80);
        assert_eq!(cpu.regs.pc(), 0x1004);
    }

    #[test]
    fn store_from_sr_writes_zero() {
        let mut bus = FlatMemory::new();
        bus.load_halfwords(0x1002, &[0x3000]);
        bus.write_word(0x2000, 0xdead_beef);
        let mut cpu = booted();
        cpu.regs.set_local(0, 0x2000);
        cpu.op_store_displacement(Operand::local(0), Operand::global(1), &mut bus);
        assert_eq!(bus.read_word(0x2000), 0);
    }

    #[test]
    fn io_word_store_maps_port_address() {
        let mut bus = FlatMemory::new();
        bus.load_halfwords(0x1002, &[0x3002]);
        let mut cpu = booted();
        cpu.regs.set_local(0, 0x0000_2000);
        cpu.regs.set_local(1, 77);
        cpu.op_store_displacement(Operand::local(0), Operand::local(1), &mut bus);
        assert_eq!(bus.io_port(0x4), 77);
    }

    #[test]
    fn stack_load_reads_spilled_locals_from_the_bank() {
        let mut bus = FlatMemory::new();
        bus.load_halfwords(0x1002, &[0x3007]);
        let mut cpu = booted();
        cpu.set_global(SP_REGISTER, 0x100);
        cpu.regs.set_local_abs(0x48 >> 2, 0x55);
        cpu.regs.set_local(4, 0x148);
        cpu.op_load_next(Operand::local(4), Operand::local(5), &mut bus);
        assert_eq!(cpu.local(5), 0x55);
        assert_eq!(cpu.local(4), 0x14c);
        assert_eq!(cpu.remaining_cycles(), 97);
    }

    #[test]
    fn store_double_post_increments_by_eight() {
        let mut bus = FlatMemory::new();
        let mut cpu = booted();
        cpu.regs.set_local(0, 0x3000);
        cpu.regs.set_local(2, 1);
        cpu.regs.set_local(3, 2);
        cpu.op_register_memory(
            Operation::StdP,
            Operand::local(0),
            Operand::local(2),
            &mut bus,
        );
        assert_eq!((bus.read_word(0x3000), bus.read_word(0x3004)), (1, 2));
        assert_eq!(cpu.local(0), 0x3008);
    }

    #[test]
    fn signed_byte_store_out_of_range_raises() {
        let mut bus = FlatMemory::new();
        bus.load_halfwords(0x1002, &[0x0000]);
        let mut cpu = booted();
        cpu.regs.set_local(0, 0x2000);
        cpu.regs.set_local(1, 0x180);
        cpu.op_store_displacement(Operand::local(0), Operand::local(1), &mut bus);
        assert_eq!(bus.read_byte(0x2000), 0x80);
        assert_eq!(cpu.regs.pc(), 0xffff_fff0);
    }
}

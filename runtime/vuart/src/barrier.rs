//! Memory barrier after device register accesses
//!
//! The VUART register file is observed and modified by the host side of the
//! bridge at any time. Every access must complete, in program order, before
//! the next one is issued.
//!
//! The BMCs carrying the VUART are 32-bit ARM: ARMv7 parts get `DMB SY`,
//! ARMv6 parts (no DMB instruction) the equivalent CP15 barrier operation.
//! AArch64 hosts also use `DMB SY`.

use core::sync::atomic::{fence, Ordering};

/// Hardware barrier emitted by [`full_barrier`] on this target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierKind {
    /// `DMB SY`
    DmbSy,
    /// `MCR p15, 0, <zero>, c7, c10, 5`
    Cp15Dmb,
    /// Sequentially consistent fence only
    Fence,
}

/// The barrier [`full_barrier`] issues on the current target
pub const fn barrier_kind() -> BarrierKind {
    if cfg!(any(
        target_arch = "aarch64",
        all(target_arch = "arm", target_feature = "v7")
    )) {
        BarrierKind::DmbSy
    } else if cfg!(target_arch = "arm") {
        BarrierKind::Cp15Dmb
    } else {
        BarrierKind::Fence
    }
}

/// Full memory barrier.
///
/// Orders all loads and stores, including device memory, before any that
/// follow, as seen by observers outside the CPU cluster. The trailing
/// sequentially consistent fence also stops the compiler moving accesses
/// across it.
#[inline]
pub fn full_barrier() {
    #[cfg(any(
        target_arch = "aarch64",
        all(target_arch = "arm", target_feature = "v7")
    ))]
    // SAFETY: DMB has no side effects beyond ordering
    unsafe {
        core::arch::asm!("dmb sy", options(nostack, preserves_flags));
    }

    #[cfg(all(target_arch = "arm", not(target_feature = "v7")))]
    // SAFETY: the CP15 data memory barrier operation only orders accesses
    unsafe {
        core::arch::asm!(
            "mcr p15, 0, {zero}, c7, c10, 5",
            zero = in(reg) 0u32,
            options(nostack, preserves_flags)
        );
    }

    fence(Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_kind_for_target() {
        let expected = if cfg!(target_arch = "aarch64") {
            BarrierKind::DmbSy
        } else if cfg!(target_arch = "arm") {
            if cfg!(target_feature = "v7") {
                BarrierKind::DmbSy
            } else {
                BarrierKind::Cp15Dmb
            }
        } else {
            BarrierKind::Fence
        };
        assert_eq!(barrier_kind(), expected);
    }

    #[test]
    fn test_arm_targets_never_fence_only() {
        if cfg!(any(target_arch = "arm", target_arch = "aarch64")) {
            assert_ne!(barrier_kind(), BarrierKind::Fence);
        }
    }

    #[test]
    fn test_full_barrier_is_callable() {
        full_barrier();
        full_barrier();
    }
}

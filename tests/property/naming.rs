// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Names and Networks

use passwordless_infra::domain::{CidrBlock, Hostname};
use proptest::prelude::*;
use std::net::Ipv4Addr;

fn label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}[a-z0-9]"
}

proptest! {
    #[test]
    fn prop_prefixed_name_stays_within_apex(sub in label(), apex in prop::sample::select(vec![
        "passwordless.tools",
        "passwordlesstools.com",
        "dev.passwordless.tools",
    ])) {
        let apex = Hostname::new(apex).unwrap();
        let name = Hostname::prefixed(&sub, &apex).unwrap();

        prop_assert!(name.is_within(&apex));
        prop_assert_eq!(name.relative_to(&apex), Some(sub.as_str()));
        prop_assert!(!apex.is_within(&name));
    }

    #[test]
    fn prop_suffix_without_label_boundary_is_outside(sub in label()) {
        let apex = Hostname::new("passwordless.tools").unwrap();
        let glued = Hostname::new(format!("{}passwordless.tools", sub)).unwrap();
        prop_assert!(!glued.is_within(&apex));
    }

    #[test]
    fn prop_aligned_networks_parse(raw in any::<u32>(), prefix in 16u8..=28) {
        let mask = u32::MAX << (32 - prefix);
        let address = Ipv4Addr::from(raw & mask);

        let cidr = CidrBlock::from_parts(address, prefix).unwrap();
        prop_assert_eq!(CidrBlock::new(cidr.to_string()).unwrap(), cidr);
        prop_assert!(cidr.overlaps(&cidr));
    }

    #[test]
    fn prop_overlap_is_symmetric(a in any::<u32>(), b in any::<u32>(), pa in 16u8..=28, pb in 16u8..=28) {
        let left = CidrBlock::from_parts(Ipv4Addr::from(a & (u32::MAX << (32 - pa))), pa).unwrap();
        let right = CidrBlock::from_parts(Ipv4Addr::from(b & (u32::MAX << (32 - pb))), pb).unwrap();
        prop_assert_eq!(left.overlaps(&right), right.overlaps(&left));
    }
}

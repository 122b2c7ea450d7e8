#![cfg(test)]
#![allow(dead_code)]

pub mod vendor_stub;

pub use vendor_stub::VendorStub;

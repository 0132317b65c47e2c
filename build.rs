fn main() {
    // Only the ESP-IDF firmware build needs the sysenv exports; host builds
    // (tests, simulation) skip embuild entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

fn main() {
    // ESP-IDF linker/sysroot plumbing is only meaningful when building for
    // the target; host builds (tests, simulation) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

fn main() {
    // Only the firmware image needs the ESP-IDF build environment; host
    // builds (tests, simulation) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

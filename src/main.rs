fn main() {
    range_sv::run();
}

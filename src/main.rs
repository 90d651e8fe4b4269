fn main() {
    randplan_lib::run()
}

fn main() {
    voxctl::run()
}

fn main() {
    zombie_waves::game::run();
}

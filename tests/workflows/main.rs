mod fixture;

mod gpkg;
mod locate;
mod rename;
mod ship;

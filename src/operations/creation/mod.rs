mod extrude;
mod make_box;
mod make_cylinder;
mod revolve;

pub use extrude::Extrude;
pub use make_box::MakeBox;
pub use make_cylinder::MakeCylinder;
pub use revolve::Revolve;

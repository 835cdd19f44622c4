mod message;
mod regmap;
mod registers;

pub mod drafting;

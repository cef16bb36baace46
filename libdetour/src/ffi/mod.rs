pub mod fnptr;

pub mod anim;
pub mod mch;
pub mod one;
pub mod tim;

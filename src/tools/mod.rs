pub mod city_image;
pub mod flight_chat;
pub mod voice;

// src/resumes/tests/mod.rs

mod analytics_tests;

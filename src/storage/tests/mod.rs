mod tests_files;

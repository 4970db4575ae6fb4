mod classification_tests;
